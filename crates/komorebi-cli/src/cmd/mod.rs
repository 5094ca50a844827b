pub mod chat;
pub mod init;
pub mod mcp;
pub mod project;
pub mod review;
pub mod today;

use crate::context::ToolContext;
use crate::output::print_json;
use crate::tools::KomorebiTool;

/// Run a tool directly and print its Markdown, or `{"tool", "text"}` with
/// `--json`. A tool failure becomes the command's error.
pub(crate) fn call_tool(
    tool: &dyn KomorebiTool,
    args: serde_json::Value,
    ctx: &ToolContext,
    json: bool,
) -> anyhow::Result<()> {
    let text = tool.call(&args, ctx).map_err(anyhow::Error::msg)?;
    if json {
        print_json(&serde_json::json!({ "tool": tool.name(), "text": text }))
    } else {
        println!("{text}");
        Ok(())
    }
}
