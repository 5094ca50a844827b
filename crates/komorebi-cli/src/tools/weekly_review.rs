use super::KomorebiTool;
use crate::context::ToolContext;
use serde_json::Value;

pub struct WeeklyReviewTool;

impl KomorebiTool for WeeklyReviewTool {
    fn name(&self) -> &str {
        "weekly_review"
    }

    fn description(&self) -> &str {
        "彙整本週（週一至今天）各 active 專案的 git commits，寫入 reviews/YYYY-Www.md。"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn call(&self, _args: &Value, ctx: &ToolContext) -> Result<String, String> {
        ctx.planner()
            .weekly_review(ctx.now())
            .map(|r| r.summary())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use komorebi_core::paths;
    use tempfile::TempDir;

    #[test]
    fn creates_then_updates_the_review() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let week = paths::weekly_review_id(ctx.now().date_naive());

        let first = WeeklyReviewTool.call(&Value::Null, &ctx).unwrap();
        assert!(first.starts_with(&format!("## 週回顧 {week} 已建立")));
        assert!(first.contains("(本週無 commits)"));

        let second = WeeklyReviewTool.call(&Value::Null, &ctx).unwrap();
        assert!(second.starts_with(&format!("## 週回顧 {week} 已更新")));
        assert!(dir
            .path()
            .join(format!("data/reviews/{week}.md"))
            .is_file());
    }
}
