use super::show_project::project_error;
use super::{optional_str, required_str, KomorebiTool};
use crate::context::ToolContext;
use komorebi_core::types::Collection;
use serde_json::Value;

pub struct UpdateSectionTool;

impl KomorebiTool for UpdateSectionTool {
    fn name(&self) -> &str {
        "update_section"
    }

    fn description(&self) -> &str {
        "替換記錄中某個標題下的內容；標題不存在時在文末新增。其他區段與 frontmatter 不變。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "記錄名稱（專案名稱、YYYY-MM-DD 或 YYYY-Www）"
                },
                "section": {
                    "type": "string",
                    "description": "標題文字，例如「Blockers」"
                },
                "content": {
                    "type": "string",
                    "description": "新的區段內容（Markdown）"
                },
                "collection": {
                    "type": "string",
                    "enum": ["projects", "daily", "reviews"],
                    "description": "記錄所在的集合，預設 projects"
                }
            },
            "required": ["name", "section", "content"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let name = required_str(args, "name")?;
        let section = required_str(args, "section")?;
        let content = args
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing required argument: content".to_string())?;
        let collection: Collection = optional_str(args, "collection")?
            .unwrap_or("projects")
            .parse()
            .map_err(|e: komorebi_core::KomorebiError| e.to_string())?;
        write_section(ctx, collection, name, section, content)
    }
}

/// Upsert a section and describe what happened.
pub fn write_section(
    ctx: &ToolContext,
    collection: Collection,
    name: &str,
    section: &str,
    content: &str,
) -> Result<String, String> {
    let replaced = ctx
        .store
        .update_section(collection, name, section, content)
        .map_err(|e| match collection {
            Collection::Projects => project_error(ctx, name, e),
            _ => e.to_string(),
        })?;
    let verb = if replaced { "已更新" } else { "已新增" };
    Ok(format!("{verb} **{name}** 的「{section}」區段"))
}
