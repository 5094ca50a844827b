use super::call_tool;
use crate::context::ToolContext;
use crate::tools::{project_activity::ProjectActivityTool, weekly_review::WeeklyReviewTool};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ReviewSubcommand {
    /// Collect this week's commits into reviews/YYYY-Www.md
    Week,
    /// Show recent commits in one project's repo
    Activity {
        name: String,
        /// Git date expression, e.g. "3 days ago" (default: yesterday)
        #[arg(long)]
        since: Option<String>,
    },
}

pub fn run(ctx: &ToolContext, subcmd: ReviewSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ReviewSubcommand::Week => call_tool(&WeeklyReviewTool, serde_json::json!({}), ctx, json),
        ReviewSubcommand::Activity { name, since } => call_tool(
            &ProjectActivityTool,
            serde_json::json!({ "name": name, "since": since }),
            ctx,
            json,
        ),
    }
}
