use super::KomorebiTool;
use crate::context::ToolContext;
use komorebi_core::store::RecordSummary;
use komorebi_core::types::Collection;
use serde_json::Value;

pub struct ListProjectsTool;

impl KomorebiTool for ListProjectsTool {
    fn name(&self) -> &str {
        "list_projects"
    }

    fn description(&self) -> &str {
        "列出所有專案及其狀態。回傳專案名稱、狀態、優先順序等摘要資訊。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn call(&self, _args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let projects = ctx
            .store
            .list(Collection::Projects)
            .map_err(|e| e.to_string())?;
        Ok(format_list(&projects))
    }
}

/// `## 專案列表` with one line per project, most important first.
pub fn format_list(projects: &[RecordSummary]) -> String {
    if projects.is_empty() {
        return "目前沒有任何專案。".to_string();
    }
    let mut lines = vec!["## 專案列表".to_string(), String::new()];
    for p in projects {
        let line = match (&p.error, p.parsed_status()) {
            (Some(err), _) => format!("- ❓ **{}** (error: {err})", p.name),
            (None, Some(status)) => format!(
                "- {} **{}** ({status}, P{})",
                status.emoji(),
                p.name,
                p.priority
            ),
            (None, None) => format!(
                "- ❓ **{}** ({}, P{})",
                p.name,
                p.status.as_deref().unwrap_or("unknown"),
                p.priority
            ),
        };
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{context, project, write_project};
    use tempfile::TempDir;

    #[test]
    fn empty_collection_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let text = ListProjectsTool.call(&Value::Null, &ctx).unwrap();
        assert_eq!(text, "目前沒有任何專案。");
    }

    #[test]
    fn lists_by_priority_with_status() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "beta", &project("Beta", "paused", 2, "b"));
        write_project(&dir, "alpha", &project("Alpha", "active", 1, "a"));
        write_project(&dir, "broken", "---\nname: [oops\n---\n");
        let ctx = context(&dir);

        let text = ListProjectsTool.call(&Value::Null, &ctx).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "## 專案列表");
        assert_eq!(lines[2], "- 🟢 **Alpha** (active, P1)");
        assert_eq!(lines[3], "- ⏸️ **Beta** (paused, P2)");
        assert!(lines[4].starts_with("- ❓ **broken** (error:"));
    }
}
