use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::{ClaudeAgentError, Result};

// ─── SessionRecord ────────────────────────────────────────────────────────

/// The last conversation, so the next launch can resume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// RFC 3339 timestamp of the last save.
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub summary: String,
}

// ─── SessionStore ─────────────────────────────────────────────────────────

/// A single JSON file holding the most recent [`SessionRecord`].
///
/// ```rust,ignore
/// let store = SessionStore::new(data_dir.join("session.json"));
/// let resume = store.load().map(|r| r.session_id);
/// // ... after a turn:
/// store.save(&result.session_id, "")?;
/// // /clear:
/// store.clear()?;
/// ```
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session, or `None` if absent or unreadable.
    pub fn load(&self) -> Option<SessionRecord> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SessionRecord>(&text) {
            Ok(r) if !r.session_id.trim().is_empty() => Some(r),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                None
            }
        }
    }

    pub fn save(&self, session_id: &str, summary: &str) -> Result<()> {
        let record = SessionRecord {
            session_id: session_id.to_string(),
            updated: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            summary: summary.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(ClaudeAgentError::Io)?;
        }
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(&self.path, json).map_err(ClaudeAgentError::Io)
    }

    /// Forget the stored session (no-op if none exists).
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(ClaudeAgentError::Io)?;
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (SessionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("data").join("session.json"));
        (store, dir)
    }

    #[test]
    fn load_returns_none_when_no_file() {
        let (store, _dir) = store();
        assert!(store.load().is_none());
    }

    #[test]
    fn save_then_load() {
        let (store, _dir) = store();
        store.save("sess-abc-123", "討論了專案進度").unwrap();
        let record = store.load().unwrap();
        assert_eq!(record.session_id, "sess-abc-123");
        assert_eq!(record.summary, "討論了專案進度");
    }

    #[test]
    fn file_uses_plain_json_keys() {
        let (store, _dir) = store();
        store.save("abc", "").unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["session_id"], "abc");
        assert!(raw["updated"].is_string());
        assert_eq!(raw["summary"], "");
    }

    #[test]
    fn corrupt_or_empty_session_is_ignored() {
        let (store, _dir) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_none());
        std::fs::write(
            store.path(),
            r#"{"session_id":"  ","updated":"2025-01-31T10:00:00+08:00"}"#,
        )
        .unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn clear_removes_session_and_is_idempotent() {
        let (store, _dir) = store();
        store.save("abc", "").unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }
}
