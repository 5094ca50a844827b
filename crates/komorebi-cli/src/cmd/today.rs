use super::call_tool;
use crate::context::ToolContext;
use crate::tools::{end_of_day::EndOfDayTool, get_today::GetTodayTool, plan_today::PlanTodayTool};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum TodaySubcommand {
    /// Create today's daily note
    Plan {
        /// The one thing that matters today (default: next task of the top project)
        #[arg(long)]
        highlight: Option<String>,
        /// Task for today; repeat for several
        #[arg(long = "task", short = 't')]
        tasks: Vec<String>,
    },
    /// Print today's daily note
    Show,
    /// Write the end-of-day review from today's commits
    End {
        /// Reflection for the notes subsection
        #[arg(long)]
        notes: Option<String>,
    },
}

pub fn run(ctx: &ToolContext, subcmd: TodaySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TodaySubcommand::Plan { highlight, tasks } => call_tool(
            &PlanTodayTool,
            serde_json::json!({ "highlight": highlight, "tasks": tasks }),
            ctx,
            json,
        ),
        TodaySubcommand::Show => call_tool(&GetTodayTool, serde_json::json!({}), ctx, json),
        TodaySubcommand::End { notes } => {
            call_tool(&EndOfDayTool, serde_json::json!({ "notes": notes }), ctx, json)
        }
    }
}
