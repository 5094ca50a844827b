use super::show_project::project_error;
use super::{required_str, KomorebiTool};
use crate::context::ToolContext;
use komorebi_core::types::{Collection, ProjectStatus};
use komorebi_core::KomorebiError;
use serde_json::Value;

pub struct UpdateProjectStatusTool;

impl KomorebiTool for UpdateProjectStatusTool {
    fn name(&self) -> &str {
        "update_project_status"
    }

    fn description(&self) -> &str {
        "更新專案的狀態（active, paused, completed, archived）。"
    }

    fn schema(&self) -> Value {
        let statuses: Vec<&str> = ProjectStatus::all().iter().map(|s| s.as_str()).collect();
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "專案名稱"
                },
                "status": {
                    "type": "string",
                    "enum": statuses,
                    "description": "新狀態"
                }
            },
            "required": ["name", "status"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let name = required_str(args, "name")?;
        let status = required_str(args, "status")?;
        let change = ctx
            .store
            .update_status(Collection::Projects, name, status)
            .map_err(|e| match e {
                KomorebiError::InvalidStatus(s) => format!(
                    "無效的狀態：{s}\n有效狀態：active, paused, completed, archived"
                ),
                other => project_error(ctx, name, other),
            })?;
        Ok(format!(
            "已更新 **{}** 狀態：{} → {}",
            change.name,
            change.old.as_deref().unwrap_or("unknown"),
            change.new
        ))
    }
}
