use super::{optional_str, string_list, KomorebiTool};
use crate::context::ToolContext;
use komorebi_core::KomorebiError;
use serde_json::Value;

pub struct PlanTodayTool;

impl KomorebiTool for PlanTodayTool {
    fn name(&self) -> &str {
        "plan_today"
    }

    fn description(&self) -> &str {
        "建立今日工作計畫。結合專案狀態與行事曆，識別最重要的 Highlight，產出時間分配建議（保留 30% 緩衝）。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "highlight": {
                    "type": "string",
                    "description": "今天最重要的一件事；省略時取最優先 active 專案的第一個未完成任務"
                },
                "tasks": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "今日任務清單"
                }
            }
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let highlight = optional_str(args, "highlight")?;
        let tasks = string_list(args, "tasks")?;
        let now = ctx.now();
        match ctx.planner().plan_today(now, highlight, &tasks) {
            Ok(outcome) => Ok(outcome.summary()),
            Err(KomorebiError::RecordExists { id, .. }) => Err(format!(
                "今日 ({id}) 的計畫已存在。使用 get_today 查看，或用 update_section 修改。"
            )),
            Err(e) => Err(e.to_string()),
        }
    }
}
