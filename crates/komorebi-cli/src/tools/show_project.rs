use super::{required_str, KomorebiTool};
use crate::context::ToolContext;
use komorebi_core::types::Collection;
use komorebi_core::KomorebiError;
use serde_json::Value;

pub struct ShowProjectTool;

impl KomorebiTool for ShowProjectTool {
    fn name(&self) -> &str {
        "show_project"
    }

    fn description(&self) -> &str {
        "顯示單一專案的完整資訊，包含目標、技術棧、進度、blockers 等詳細內容。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "專案名稱或檔名（不分大小寫）"
                }
            },
            "required": ["name"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let name = required_str(args, "name")?;
        ctx.store
            .read(Collection::Projects, name)
            .map_err(|e| project_error(ctx, name, e))
    }
}

/// Error text for a project lookup; a miss lists what does exist.
pub fn project_error(ctx: &ToolContext, name: &str, err: KomorebiError) -> String {
    if !err.is_not_found() {
        return err.to_string();
    }
    let available = ctx.store.ids(Collection::Projects).unwrap_or_default();
    let available = if available.is_empty() {
        "(無)".to_string()
    } else {
        available.join(", ")
    };
    format!("找不到專案：{name}\n可用的專案：{available}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{context, project, write_project};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn returns_the_full_record() {
        let dir = TempDir::new().unwrap();
        let text = project("demo", "active", 1, "寫測試");
        write_project(&dir, "demo", &text);
        let ctx = context(&dir);
        assert_eq!(ShowProjectTool.call(&json!({"name": "DEMO"}), &ctx).unwrap(), text);
    }

    #[test]
    fn matches_frontmatter_name() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "komorebi-agent", &project("Komorebi", "active", 1, "x"));
        let ctx = context(&dir);
        let text = ShowProjectTool.call(&json!({"name": "komorebi"}), &ctx).unwrap();
        assert!(text.contains("name: Komorebi"));
    }

    #[test]
    fn missing_project_lists_alternatives() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "demo", &project("demo", "active", 1, "x"));
        let ctx = context(&dir);
        let err = ShowProjectTool
            .call(&json!({"name": "nonexistent"}), &ctx)
            .unwrap_err();
        assert_eq!(err, "找不到專案：nonexistent\n可用的專案：demo");
    }

    #[test]
    fn name_is_required() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        assert!(ShowProjectTool.call(&json!({}), &ctx).is_err());
    }
}
