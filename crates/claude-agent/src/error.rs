use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaudeAgentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse stream-json line: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{0}` not found; install the Claude CLI or set its path")]
    NotInstalled(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Session file error: {0}")]
    Session(#[from] serde_json::Error),
}
