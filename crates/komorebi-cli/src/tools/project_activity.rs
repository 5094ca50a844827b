use super::show_project::project_error;
use super::{optional_str, required_str, KomorebiTool};
use crate::context::ToolContext;
use serde_json::Value;

pub struct ProjectActivityTool;

impl KomorebiTool for ProjectActivityTool {
    fn name(&self) -> &str {
        "project_activity"
    }

    fn description(&self) -> &str {
        "查詢專案 repo 近期的 git commits（唯讀）。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "專案名稱"
                },
                "since": {
                    "type": "string",
                    "description": "git 時間表示式，例如 yesterday、3 days ago、2025-01-01；預設 yesterday"
                }
            },
            "required": ["name"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let name = required_str(args, "name")?;
        let since = optional_str(args, "since")?;
        ctx.planner()
            .project_activity(name, since)
            .map(|a| a.summary())
            .map_err(|e| project_error(ctx, name, e))
    }
}
