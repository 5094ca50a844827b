use thiserror::Error;

#[derive(Debug, Error)]
pub enum KomorebiError {
    #[error("{collection} record not found: {id}")]
    RecordNotFound { collection: String, id: String },

    #[error("{collection} record already exists: {id}")]
    RecordExists { collection: String, id: String },

    #[error("invalid status '{0}': expected one of active, paused, completed, archived")]
    InvalidStatus(String),

    #[error("invalid frontmatter in {path}: {reason}")]
    InvalidFrontmatter { path: String, reason: String },

    #[error("invalid record identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{path} was modified by another process since it was read; re-read and retry")]
    Conflict { path: String },

    #[error("external command failed: {0}")]
    ExternalProcess(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl KomorebiError {
    /// True for errors that mean "the thing asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, KomorebiError::RecordNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, KomorebiError>;
