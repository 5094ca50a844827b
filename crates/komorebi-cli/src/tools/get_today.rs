use super::KomorebiTool;
use crate::context::ToolContext;
use serde_json::Value;

pub struct GetTodayTool;

impl KomorebiTool for GetTodayTool {
    fn name(&self) -> &str {
        "get_today"
    }

    fn description(&self) -> &str {
        "讀取今日的工作計畫。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn call(&self, _args: &Value, ctx: &ToolContext) -> Result<String, String> {
        let date = ctx.now().date_naive();
        match ctx.planner().get_today(date).map_err(|e| e.to_string())? {
            Some(text) => Ok(text),
            None => Ok(format!("今日 ({date}) 尚未建立計畫。使用 plan_today 建立。")),
        }
    }
}
