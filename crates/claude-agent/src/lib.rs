//! `claude-agent`: Rust driver for the `claude` CLI subprocess.
//!
//! Speaks the `--input-format stream-json --output-format stream-json`
//! protocol, so a front-end can hold a multi-turn conversation with tool
//! access without embedding any SDK runtime.
//!
//! # Architecture
//!
//! ```text
//! QueryOptions
//!     │
//!     ▼
//! ClaudeProcess   ← spawns `claude --print --output-format stream-json …`
//!     │              writes the user message, reads JSONL from stdout
//!     ▼
//! QueryStream     ← futures::Stream<Item = Result<Message>>
//!     │              background task + mpsc channel
//!     ▼
//! ChatSession     ← resume across turns, TurnEvent callbacks, UsageStats
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use claude_agent::{ChatSession, QueryOptions, TurnEvent};
//!
//! let mut chat = ChatSession::new(QueryOptions {
//!     model: Some("claude-sonnet-4-5-20250929".into()),
//!     ..Default::default()
//! });
//! let turn = chat.send("今天有什麼行程？", &mut |ev| {
//!     if let TurnEvent::ToolUse { name, .. } = ev {
//!         eprintln!("→ {name}");
//!     }
//! }).await?;
//! println!("{}", turn.text);
//! ```

pub mod error;
pub mod runner;
pub mod session;
pub mod stream;
pub mod types;
pub mod usage;

pub(crate) mod process;


pub use error::ClaudeAgentError;
pub use runner::{ChatSession, TurnEvent, TurnResult};
pub use session::{SessionRecord, SessionStore};
pub use stream::QueryStream;
pub use types::{
    AssistantContent, AssistantMessage, ContentBlock, McpServerConfig, McpServerStatus, Message,
    PermissionMode, QueryOptions, ResultMessage, ResultSubtype, SystemInit, SystemMessage,
    SystemPayload, TokenUsage, UserContentBlock, UserMessage,
};
pub use usage::UsageStats;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClaudeAgentError>;

/// Run a single query against the Claude CLI.
///
/// Returns a [`QueryStream`] that yields [`Message`] values as they arrive
/// from the subprocess. The stream terminates after the first
/// [`Message::Result`] or on process exit.
///
/// ```rust,ignore
/// use claude_agent::{query, QueryOptions};
/// use futures::StreamExt;
///
/// let messages: Vec<_> = query("say hello", QueryOptions::default()).collect().await;
/// ```
pub fn query(prompt: impl Into<String>, opts: QueryOptions) -> QueryStream {
    QueryStream::new(prompt.into(), opts)
}
