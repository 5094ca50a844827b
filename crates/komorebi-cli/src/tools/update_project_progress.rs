use super::update_section::write_section;
use super::{required_str, KomorebiTool};
use crate::context::ToolContext;
use komorebi_core::planning::SECTION_PROGRESS;
use komorebi_core::types::Collection;
use serde_json::Value;

pub struct UpdateProjectProgressTool;

impl KomorebiTool for UpdateProjectProgressTool {
    fn name(&self) -> &str {
        "update_project_progress"
    }

    fn description(&self) -> &str {
        "更新專案的「當前進度」區段，例如勾選完成的任務或加入新任務。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "專案名稱"
                },
                "content": {
                    "type": "string",
                    "description": "新的進度內容，通常是 - [ ] / - [x] 任務清單"
                }
            },
            "required": ["name", "content"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let name = required_str(args, "name")?;
        let content = required_str(args, "content")?;
        write_section(ctx, Collection::Projects, name, SECTION_PROGRESS, content)
    }
}
