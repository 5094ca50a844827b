mod cmd;
mod context;
mod output;
mod root;
mod tools;

use clap::{Parser, Subcommand};
use cmd::{project::ProjectSubcommand, review::ReviewSubcommand, today::TodaySubcommand};
use context::ToolContext;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "komorebi",
    about = "Personal executive assistant: projects, daily plans and reviews, driven by Claude",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file (default: auto-detect config/settings.yaml upward from cwd)
    #[arg(long, global = true, env = "KOMOREBI_CONFIG")]
    config: Option<PathBuf>,

    /// Model alias (opus, sonnet, haiku) or full model id
    #[arg(long, global = true, env = "KOMOREBI_MODEL", default_value = cmd::chat::DEFAULT_MODEL)]
    model: String,

    /// Spending cap for the session in USD
    #[arg(long, global = true)]
    budget: Option<f64>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (the default)
    Chat,

    /// Run as an MCP stdio server (spawned by the chat session)
    Mcp,

    /// Create config/settings.yaml and the data directories
    Init,

    /// Read and edit project records
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Plan, show, and close out today
    Today {
        #[command(subcommand)]
        subcommand: TodaySubcommand,
    },

    /// Weekly review and repo activity
    Review {
        #[command(subcommand)]
        subcommand: ReviewSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Some(Commands::Mcp) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    // stdout carries MCP frames and REPL output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let explicit = cli.config.as_deref();
    let root = root::resolve_root(explicit);
    let config_path = root::resolve_config(&root, explicit);

    let result = run(&root, &config_path, cli.command, &cli.model, cli.budget, cli.json);

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(
    root: &Path,
    config_path: &Path,
    command: Option<Commands>,
    model: &str,
    budget: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(Commands::Init) = command {
        return cmd::init::run(root, config_path);
    }

    let ctx = ToolContext::load(root, config_path)?;
    match command {
        None | Some(Commands::Chat) => cmd::chat::run(&ctx, model, budget),
        Some(Commands::Mcp) => cmd::mcp::run(&ctx),
        Some(Commands::Init) => Ok(()),
        Some(Commands::Project { subcommand }) => cmd::project::run(&ctx, subcommand, json),
        Some(Commands::Today { subcommand }) => cmd::today::run(&ctx, subcommand, json),
        Some(Commands::Review { subcommand }) => cmd::review::run(&ctx, subcommand, json),
    }
}
