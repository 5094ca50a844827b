use crate::context::ToolContext;
use serde::Serialize;
use serde_json::Value;

pub mod add_event;
pub mod end_of_day;
pub mod get_memory;
pub mod get_today;
pub mod list_events;
pub mod list_projects;
pub mod load_skill;
pub mod plan_today;
pub mod project_activity;
pub mod remember;
pub mod show_project;
pub mod update_project_progress;
pub mod update_project_status;
pub mod update_section;
pub mod weekly_review;

/// Name of the MCP server the tools are registered under.
pub const SERVER_NAME: &str = "komorebi";

pub trait KomorebiTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    /// Markdown text for the model, or a message explaining the failure.
    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String>;
}

pub fn all_tools() -> Vec<Box<dyn KomorebiTool>> {
    vec![
        Box::new(list_projects::ListProjectsTool),
        Box::new(show_project::ShowProjectTool),
        Box::new(update_project_status::UpdateProjectStatusTool),
        Box::new(update_project_progress::UpdateProjectProgressTool),
        Box::new(update_section::UpdateSectionTool),
        Box::new(plan_today::PlanTodayTool),
        Box::new(get_today::GetTodayTool),
        Box::new(end_of_day::EndOfDayTool),
        Box::new(project_activity::ProjectActivityTool),
        Box::new(weekly_review::WeeklyReviewTool),
        Box::new(list_events::ListEventsTool),
        Box::new(add_event::AddEventTool),
        Box::new(get_memory::GetMemoryTool),
        Box::new(remember::RememberTool),
        Box::new(load_skill::LoadSkillTool),
    ]
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub r#type: &'static str,
    pub text: String,
}

/// `{content: [{type: "text", text}], is_error}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub content: Vec<TextContent>,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                r#type: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    pub fn first_text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

/// Run a tool and wrap the outcome; failures become an error envelope.
pub fn invoke(tool: &dyn KomorebiTool, args: &Value, ctx: &ToolContext) -> ToolResponse {
    match tool.call(args, ctx) {
        Ok(text) => ToolResponse::text(text),
        Err(e) => {
            tracing::info!(tool = tool.name(), error = %e, "tool call failed");
            ToolResponse::error(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// A non-blank string argument.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    optional_str(args, key)?.ok_or_else(|| format!("missing required argument: {key}"))
}

/// A string argument; absent, null and blank all read as `None`.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(format!("argument '{key}' must be a string, got {other}")),
    }
}

/// A non-negative integer argument; numeric strings are accepted.
pub fn optional_u32(args: &Value, key: &str) -> Result<Option<u32>, String> {
    let invalid = || format!("argument '{key}' must be a non-negative integer");
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// A list of strings; a single string is taken as a one-item list.
pub fn string_list(args: &Value, key: &str) -> Result<Vec<String>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("argument '{key}' must contain only strings"))
            })
            .collect(),
        Some(_) => Err(format!("argument '{key}' must be a list of strings")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_shape() {
        let v = serde_json::to_value(ToolResponse::error("boom")).unwrap();
        assert_eq!(v, json!({"content": [{"type": "text", "text": "boom"}], "is_error": true}));
    }

    #[test]
    fn tool_names_are_unique() {
        let tools = all_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name().to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 15);
    }

    #[test]
    fn schemas_are_objects() {
        for tool in all_tools() {
            let schema = tool.schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(schema["properties"].is_object(), "{}", tool.name());
        }
    }

    #[test]
    fn string_arguments() {
        let args = json!({"name": "demo", "blank": "  ", "n": 3});
        assert_eq!(required_str(&args, "name").unwrap(), "demo");
        assert!(required_str(&args, "blank").unwrap_err().contains("blank"));
        assert!(required_str(&args, "missing").unwrap_err().contains("missing required"));
        assert!(optional_str(&args, "n").is_err());
    }

    #[test]
    fn integer_arguments() {
        let args = json!({"a": 3, "b": "7", "c": -1, "d": "x"});
        assert_eq!(optional_u32(&args, "a").unwrap(), Some(3));
        assert_eq!(optional_u32(&args, "b").unwrap(), Some(7));
        assert!(optional_u32(&args, "c").is_err());
        assert!(optional_u32(&args, "d").is_err());
        assert_eq!(optional_u32(&args, "e").unwrap(), None);
    }

    #[test]
    fn list_arguments() {
        let args = json!({"tasks": ["a", "b"], "one": "c", "bad": [1]});
        assert_eq!(string_list(&args, "tasks").unwrap(), vec!["a", "b"]);
        assert_eq!(string_list(&args, "one").unwrap(), vec!["c"]);
        assert!(string_list(&args, "bad").is_err());
        assert!(string_list(&args, "none").unwrap().is_empty());
    }
}
