use super::{optional_str, KomorebiTool};
use crate::context::ToolContext;
use serde_json::Value;

pub struct EndOfDayTool;

impl KomorebiTool for EndOfDayTool {
    fn name(&self) -> &str {
        "end_of_day"
    }

    fn description(&self) -> &str {
        "結束今日工作。掃描各 active 專案今天的 git commits，寫入專案進度日誌，並產出日終回顧。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "notes": {
                    "type": "string",
                    "description": "今日心得或備註"
                }
            }
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let notes = optional_str(args, "notes")?;
        let now = ctx.now();
        match ctx.planner().end_of_day(now, notes) {
            Ok(outcome) => Ok(outcome.summary()),
            Err(e) if e.is_not_found() => Err(format!(
                "今日 ({}) 尚未建立計畫，無法進行日終回顧。請先使用 plan_today。",
                now.date_naive()
            )),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use crate::tools::get_today::GetTodayTool;
    use crate::tools::plan_today::PlanTodayTool;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn requires_a_plan() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let err = EndOfDayTool.call(&json!({}), &ctx).unwrap_err();
        assert!(err.contains("尚未建立計畫"));
    }

    #[test]
    fn writes_the_review_section() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        PlanTodayTool.call(&json!({"highlight": "x"}), &ctx).unwrap();

        let summary = EndOfDayTool
            .call(&json!({"notes": "今天很順利"}), &ctx)
            .unwrap();
        assert!(summary.starts_with("## 日終回顧完成"));
        assert!(summary.contains("- (今日無 commits)"));

        let note = GetTodayTool.call(&json!({}), &ctx).unwrap();
        assert!(note.contains("### 筆記\n今天很順利"));
        assert!(!note.contains("(待今日結束時填寫)"));
    }
}
