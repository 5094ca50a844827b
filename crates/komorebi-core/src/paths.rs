use crate::error::{KomorebiError, Result};
use crate::types::Collection;
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_DIR: &str = "config";
pub const CONFIG_FILE: &str = "config/settings.yaml";
pub const DEFAULT_DATA_DIR: &str = "data";

pub const MEMORY_FILE: &str = "memory/facts.yaml";
pub const SESSION_FILE: &str = "session.json";

pub const RECORD_EXT: &str = "md";

pub const SKILLS_DIR: &str = ".claude/skills";
pub const SKILL_FILE: &str = "SKILL.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn collection_dir(data_dir: &Path, collection: Collection) -> PathBuf {
    data_dir.join(collection.dir_name())
}

pub fn record_path(data_dir: &Path, collection: Collection, id: &str) -> PathBuf {
    collection_dir(data_dir, collection).join(format!("{id}.{RECORD_EXT}"))
}

pub fn memory_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MEMORY_FILE)
}

pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SESSION_FILE)
}

pub fn skills_dir(root: &Path) -> PathBuf {
    root.join(SKILLS_DIR)
}

/// Daily notes are keyed by ISO date: `2025-01-31`.
pub fn daily_id(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Weekly reviews are keyed by ISO week: `2025-W05`.
pub fn weekly_review_id(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

/// Record identifiers become file stems, so they must not escape the
/// collection directory. Anything else (including CJK text) is allowed.
pub fn validate_id(id: &str) -> Result<()> {
    let bad = id.trim().is_empty()
        || id.len() > 128
        || id.starts_with('.')
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_control);
    if bad {
        return Err(KomorebiError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids() {
        for id in ["demo", "LayerWise", "2025-01-31", "個人網站", "my project"] {
            validate_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_ids() {
        for id in ["", "  ", "../etc/passwd", "a/b", "a\\b", ".hidden", "tab\there"] {
            assert!(validate_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn path_helpers() {
        let data = Path::new("/tmp/data");
        assert_eq!(
            record_path(data, Collection::Projects, "demo"),
            PathBuf::from("/tmp/data/projects/demo.md")
        );
        assert_eq!(
            memory_path(data),
            PathBuf::from("/tmp/data/memory/facts.yaml")
        );
        assert_eq!(
            config_path(Path::new("/tmp/home")),
            PathBuf::from("/tmp/home/config/settings.yaml")
        );
    }

    #[test]
    fn date_keys() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(daily_id(d), "2025-01-31");
        assert_eq!(weekly_review_id(d), "2025-W05");
        // ISO week-year differs from calendar year at the boundary
        let d = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(weekly_review_id(d), "2025-W01");
    }
}
