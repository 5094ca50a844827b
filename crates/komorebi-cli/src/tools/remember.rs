use super::{required_str, KomorebiTool};
use crate::context::ToolContext;
use komorebi_core::memory::MemoryCategory;
use serde_json::Value;

pub struct RememberTool;

impl KomorebiTool for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }

    fn description(&self) -> &str {
        "記住重要的用戶偏好或專案事實。當使用者提到偏好（如「我喜歡...」）或重要專案資訊時使用。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": ["user", "projects"],
                    "description": "類別：user（用戶偏好）或 projects（專案事實）"
                },
                "key": {
                    "type": "string",
                    "description": "key 名稱（如 work_style, coding_preference, 或專案名稱）"
                },
                "value": {
                    "type": "string",
                    "description": "要記住的內容"
                }
            },
            "required": ["category", "key", "value"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let category: MemoryCategory = required_str(args, "category")?
            .parse()
            .map_err(|e: komorebi_core::KomorebiError| e.to_string())?;
        let (Ok(key), Ok(value)) = (required_str(args, "key"), required_str(args, "value")) else {
            return Err("請提供 key 和 value。".to_string());
        };
        ctx.memory
            .remember(category, key, value)
            .map_err(|e| e.to_string())?;
        Ok(format!("已記住：[{category}] {} = {}", key.trim(), value.trim()))
    }
}
