use super::{optional_str, KomorebiTool};
use crate::context::ToolContext;
use komorebi_core::memory::{self, MemoryCategory};
use serde_json::Value;

pub struct GetMemoryTool;

impl KomorebiTool for GetMemoryTool {
    fn name(&self) -> &str {
        "get_memory"
    }

    fn description(&self) -> &str {
        "讀取記憶中的用戶偏好或專案事實。用於回顧偏好設定或專案相關資訊。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": ["user", "projects"],
                    "description": "記憶類別：user（用戶偏好）或 projects（專案事實），預設 user"
                },
                "key": {
                    "type": "string",
                    "description": "可選，特定的 key（如專案名稱或偏好項目）。不指定則返回整個類別。"
                }
            }
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let category: MemoryCategory = optional_str(args, "category")?
            .unwrap_or("user")
            .parse()
            .map_err(|e: komorebi_core::KomorebiError| e.to_string())?;
        let key = optional_str(args, "key")?;
        let found = ctx.memory.get(category, key).map_err(|e| e.to_string())?;
        Ok(match (found, key) {
            (Some(value), _) => memory::render(category, key, &value),
            (None, Some(k)) => format!("找不到記憶：{category}/{k}"),
            (None, None) => format!("類別 {category} 中沒有記憶。"),
        })
    }
}
