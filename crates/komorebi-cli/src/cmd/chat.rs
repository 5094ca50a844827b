use crate::context::ToolContext;
use crate::tools::{self, get_today::GetTodayTool, list_projects::ListProjectsTool, KomorebiTool};
use anyhow::{Context, Result};
use claude_agent::{
    ChatSession, McpServerConfig, PermissionMode, QueryOptions, SessionStore, TurnEvent,
    TurnResult, UsageStats,
};
use komorebi_core::paths;
use komorebi_core::skills::SkillSet;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const DEFAULT_MODEL: &str = "sonnet";

const SYSTEM_PROMPT_FILE: &str = "prompts/system.md";
const DEFAULT_SYSTEM_PROMPT: &str = "你是 Komorebi，使用者的個人執行助理。請用繁體中文回答。\n\n\
你可以使用工具讀寫專案記錄、建立每日計畫、做日終與週回顧、查詢行事曆與記憶。\
修改記錄前先讀取現況；一次只改需要的區段。";

const HELP: &str = "\
/usage    查看 API 消耗
/projects 列出專案
/today    顯示今日計畫
/clear    開始新對話
/help     顯示幫助
exit      離開";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Full model id for an alias; anything else is passed through.
pub fn resolve_model(name: &str) -> String {
    match name.trim().to_lowercase().as_str() {
        "opus" => "claude-opus-4-5-20251101".to_string(),
        "sonnet" => "claude-sonnet-4-5-20250929".to_string(),
        "haiku" => "claude-haiku-4-5-20251001".to_string(),
        _ => name.trim().to_string(),
    }
}

/// `prompts/system.md` under the root (or the built-in prompt), followed by
/// the table of available skills when there are any.
pub fn system_prompt(root: &Path, skills: &SkillSet) -> String {
    let base = base_prompt(root);
    let listing = skills.list_prompt();
    if listing.is_empty() {
        base
    } else {
        format!("{}\n\n{listing}", base.trim_end())
    }
}

fn base_prompt(root: &Path) -> String {
    let path = root.join(SYSTEM_PROMPT_FILE);
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "system prompt unreadable, using default");
            }
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Query options that point the runtime at `komorebi mcp` on this binary.
pub fn query_options(ctx: &ToolContext, model: &str, budget: Option<f64>) -> QueryOptions {
    let exe = std::env::current_exe().unwrap_or_else(|_| "komorebi".into());
    let server = McpServerConfig {
        name: tools::SERVER_NAME.into(),
        command: exe.to_string_lossy().into_owned(),
        args: vec![
            "--config".into(),
            ctx.config_path.to_string_lossy().into_owned(),
            "mcp".into(),
        ],
        env: HashMap::new(),
    };
    let allowed_tools = tools::all_tools()
        .iter()
        .map(|t| server.tool_name(t.name()))
        .collect();

    QueryOptions {
        model: Some(resolve_model(model)),
        max_budget_usd: budget,
        allowed_tools,
        permission_mode: PermissionMode::DontAsk,
        system_prompt: Some(system_prompt(&ctx.root, &ctx.skills)),
        mcp_servers: vec![server],
        cwd: Some(ctx.root.clone()),
        ..Default::default()
    }
}

/// `mcp__komorebi__plan_today` → `plan_today`.
pub fn display_tool_name(name: &str) -> &str {
    name.strip_prefix("mcp__")
        .and_then(|rest| rest.split_once("__"))
        .map(|(_, tool)| tool)
        .unwrap_or(name)
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub enum Input<'a> {
    Empty,
    Exit,
    Usage,
    Help,
    Clear,
    Projects,
    Today,
    Unknown(&'a str),
    Prompt(&'a str),
}

pub fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => Input::Empty,
        "exit" | "quit" | "q" | "/exit" | "/quit" => Input::Exit,
        "/usage" | "/cost" => Input::Usage,
        "/help" | "/?" => Input::Help,
        "/clear" | "/new" => Input::Clear,
        "/projects" => Input::Projects,
        "/today" => Input::Today,
        cmd if cmd.starts_with('/') && !cmd.contains(char::is_whitespace) => {
            Input::Unknown(trimmed)
        }
        _ => Input::Prompt(trimmed),
    }
}

// ---------------------------------------------------------------------------
// REPL
// ---------------------------------------------------------------------------

pub fn run(ctx: &ToolContext, model: &str, budget: Option<f64>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(repl(ctx, model, budget))
}

async fn repl(ctx: &ToolContext, model: &str, budget: Option<f64>) -> Result<()> {
    let sessions = SessionStore::new(paths::session_path(ctx.data_dir()));
    let opts = query_options(ctx, model, budget);
    let mut chat = match sessions.load() {
        Some(saved) => {
            tracing::info!(session = %saved.session_id, "resuming saved session");
            ChatSession::resume(opts, saved.session_id)
        }
        None => ChatSession::new(opts),
    };

    println!("Komorebi v{}  你的個人執行助理", env!("CARGO_PKG_VERSION"));
    let budget_note = budget.map(|b| format!(" | 預算 ${b}")).unwrap_or_default();
    println!("模型: {model}{budget_note} | 輸入 /help 查看指令 | exit 離開");
    if chat.session_id().is_some() {
        println!("(繼續上次的對話，/clear 開始新對話)");
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            farewell(chat.usage());
            return Ok(());
        };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Exit => {
                farewell(chat.usage());
                return Ok(());
            }
            Input::Usage => println!("{}\n", chat.usage().summary_line()),
            Input::Help => println!("{HELP}\n"),
            Input::Clear => {
                chat.reset();
                sessions.clear()?;
                println!("(已開始新對話)\n");
            }
            Input::Projects => print_tool(&ListProjectsTool, ctx),
            Input::Today => print_tool(&GetTodayTool, ctx),
            Input::Unknown(cmd) => println!("未知指令：{cmd}（/help 查看可用指令）\n"),
            Input::Prompt(prompt) => {
                match turn(&mut chat, prompt).await {
                    Ok(result) => {
                        if let Err(e) = sessions.save(&result.session_id, &summary_of(prompt)) {
                            tracing::warn!(error = %e, "session not saved");
                        }
                    }
                    Err(e) => println!("錯誤：{e}"),
                }
                println!();
            }
        }
    }
}

async fn turn(chat: &mut ChatSession, prompt: &str) -> claude_agent::Result<TurnResult> {
    print!("Komorebi: ");
    let _ = std::io::stdout().flush();

    let mut has_text = false;
    let result = chat
        .send(prompt, &mut |event| match event {
            TurnEvent::Text(text) => {
                print!("{text}");
                let _ = std::io::stdout().flush();
                has_text = true;
            }
            TurnEvent::ToolUse { name, .. } => {
                if has_text {
                    println!();
                    has_text = false;
                }
                print!("  → {}", display_tool_name(&name));
                let _ = std::io::stdout().flush();
            }
            TurnEvent::ToolResult { is_error } => println!("{}", if is_error { " ✗" } else { " ✓" }),
            TurnEvent::Thinking(_) => {}
        })
        .await?;

    if has_text {
        println!();
    }
    if result.is_error {
        println!("錯誤：{}", result.text);
    }
    let this_turn = UsageStats {
        total_cost_usd: result.total_cost_usd,
        input_tokens: result.usage.input_tokens,
        output_tokens: result.usage.output_tokens,
        turns: u64::from(result.num_turns.max(1)),
        ..Default::default()
    };
    println!("{}", this_turn.summary_line());
    Ok(result)
}

fn print_tool(tool: &dyn KomorebiTool, ctx: &ToolContext) {
    let response = tools::invoke(tool, &serde_json::json!({}), ctx);
    println!("{}\n", response.first_text());
}

fn farewell(usage: &UsageStats) {
    println!("{}", usage.summary_line());
    println!("再見！");
}

/// First line of the prompt, shortened for `session.json`.
fn summary_of(prompt: &str) -> String {
    const MAX: usize = 50;
    let first = prompt.lines().next().unwrap_or("").trim();
    if first.chars().count() > MAX {
        format!("{}…", first.chars().take(MAX).collect::<String>())
    } else {
        first.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
