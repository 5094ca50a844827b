use super::{required_str, KomorebiTool};
use crate::context::ToolContext;
use serde_json::Value;

pub struct LoadSkillTool;

impl KomorebiTool for LoadSkillTool {
    fn name(&self) -> &str {
        "load_skill"
    }

    fn description(&self) -> &str {
        "載入技能指引。當需要執行特定任務（如專案管理、任務追蹤）時，先載入對應 skill 獲取詳細指引。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "要載入的技能名稱"
                }
            },
            "required": ["name"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let name = required_str(args, "name")?.trim();
        match ctx.skills.load(name).map_err(|e| e.to_string())? {
            Some(text) => Ok(text),
            None => Err(format!(
                "找不到 skill: {name}\n可用: {}",
                ctx.skills.names().join(", ")
            )),
        }
    }
}
