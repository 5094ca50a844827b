use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Outer Message enum ───────────────────────────────────────────────────

/// Messages emitted by `claude --output-format stream-json` that a chat
/// front-end acts on. Other `type`s are skipped by the reader.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    Assistant(AssistantMessage),
    User(UserMessage),
    Result(ResultMessage),
}

impl Message {
    pub fn session_id(&self) -> &str {
        match self {
            Message::System(m) => &m.session_id,
            Message::Assistant(m) => &m.session_id,
            Message::User(m) => &m.session_id,
            Message::Result(m) => &m.session_id,
        }
    }

    pub fn as_result(&self) -> Option<&ResultMessage> {
        if let Message::Result(r) = self {
            Some(r)
        } else {
            None
        }
    }
}

// ─── System messages ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemMessage {
    pub session_id: String,
    #[serde(flatten)]
    pub payload: SystemPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum SystemPayload {
    /// First message of every run: model, tools and MCP server status.
    Init(SystemInit),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemInit {
    pub model: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<McpServerStatus>,
    #[serde(default, alias = "permissionMode")]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

impl SystemInit {
    /// MCP servers the CLI failed to start or connect to.
    pub fn failed_servers(&self) -> impl Iterator<Item = &McpServerStatus> {
        self.mcp_servers.iter().filter(|s| s.status != "connected")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpServerStatus {
    pub name: String,
    pub status: String,
}

// ─── Assistant messages ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub message: AssistantContent,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
    pub session_id: String,
}

impl AssistantMessage {
    /// Concatenated text blocks.
    pub fn text(&self) -> String {
        self.message
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantContent {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    Thinking {
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

// ─── User messages ────────────────────────────────────────────────────────

/// Tool results fed back to the model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserMessage {
    pub message: UserContent,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserContent {
    #[serde(default)]
    pub content: Vec<UserContentBlock>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContentBlock {
    ToolResult {
        tool_use_id: String,
        /// A string or a list of content blocks, depending on the tool.
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Other,
}

// ─── Result messages ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSubtype {
    Success,
    ErrorDuringExecution,
    ErrorMaxTurns,
    ErrorMaxBudgetUsd,
    #[serde(other)]
    OtherError,
}

impl ResultSubtype {
    pub fn describe(self) -> &'static str {
        match self {
            ResultSubtype::Success => "success",
            ResultSubtype::ErrorDuringExecution => "error during execution",
            ResultSubtype::ErrorMaxTurns => "maximum turns reached",
            ResultSubtype::ErrorMaxBudgetUsd => "budget limit reached",
            ResultSubtype::OtherError => "run failed",
        }
    }
}

/// `type = "result"`, the terminal message of every run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultMessage {
    pub subtype: ResultSubtype,
    pub session_id: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ResultMessage {
    pub fn is_error(&self) -> bool {
        self.is_error || self.subtype != ResultSubtype::Success
    }

    /// Final answer text. `None` for error subtypes.
    pub fn result_text(&self) -> Option<&str> {
        match self.subtype {
            ResultSubtype::Success => self.result.as_deref(),
            _ => None,
        }
    }

    /// Human-readable reason for a failed run.
    pub fn error_text(&self) -> String {
        if !self.errors.is_empty() {
            return self.errors.join("; ");
        }
        match (&self.result, self.subtype) {
            (Some(r), _) if self.is_error && !r.is_empty() => r.clone(),
            (_, subtype) => subtype.describe().to_string(),
        }
    }
}

// ─── QueryOptions ─────────────────────────────────────────────────────────

/// Options for one `claude` invocation.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Full model id, e.g. `claude-sonnet-4-5-20250929`.
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    /// Spend limit; the CLI stops with `error_max_budget_usd` beyond it.
    pub max_budget_usd: Option<f64>,
    /// Tools usable without prompting (`mcp__<server>__<tool>` for MCP tools).
    pub allowed_tools: Vec<String>,
    pub permission_mode: PermissionMode,
    pub system_prompt: Option<String>,
    pub append_system_prompt: Option<String>,
    /// Session to continue; carries the conversation history.
    pub resume: Option<String>,
    pub mcp_servers: Vec<McpServerConfig>,
    pub cwd: Option<std::path::PathBuf>,
    pub env: HashMap<String, String>,
    /// Path to the `claude` binary (default: `claude` on `PATH`).
    pub path_to_executable: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionMode {
    #[default]
    Default,
    AcceptEdits,
    BypassPermissions,
    Plan,
    DontAsk,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
            PermissionMode::DontAsk => "dontAsk",
        }
    }
}

/// A stdio MCP server the CLI should start for the session.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Used in tool names as `mcp__<name>__<tool>`.
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl McpServerConfig {
    /// Fully-qualified name the CLI uses for one of this server's tools.
    pub fn tool_name(&self, tool: &str) -> String {
        format!("mcp__{}__{}", self.name, tool)
    }
}
