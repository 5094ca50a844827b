//! Read-only commit history for project repositories.
//!
//! Only `git log` is ever invoked. Every failure mode (missing path, not a
//! repository, git not installed, timeout) degrades to "no commits".

use crate::config::CommandsConfig;
use crate::process;
use chrono::NaiveDate;
use std::path::Path;
use std::time::Duration;

/// Time expression used when the caller does not give one.
pub const DEFAULT_SINCE: &str = "yesterday";

/// Time expression for "since midnight today".
pub const TODAY: &str = "00:00";

const LOG_FORMAT: &str = "--format=%s (%h)";

/// Source of commit summaries, one `"<subject> (<short hash>)"` per entry.
pub trait HistorySource {
    fn commits_since(&self, repo: &Path, since: &str) -> Vec<String>;

    /// Commits with author date in `[since, until)`.
    fn commits_between(&self, repo: &Path, since: NaiveDate, until: NaiveDate) -> Vec<String>;
}

#[derive(Debug, Clone)]
pub struct GitScanner {
    program: String,
    timeout: Duration,
}

impl GitScanner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(commands: &CommandsConfig) -> Self {
        Self::new(commands.git.clone(), commands.timeout())
    }

    fn log(&self, repo: &Path, filters: Vec<String>) -> Vec<String> {
        if !repo.is_dir() {
            tracing::debug!(repo = %repo.display(), "repository path missing, skipping");
            return Vec::new();
        }
        let mut args = vec![
            "-C".to_string(),
            repo.display().to_string(),
            "log".to_string(),
        ];
        args.extend(filters);
        args.push(LOG_FORMAT.to_string());
        args.push("--no-merges".to_string());

        match process::run_bounded(&self.program, &args, None, self.timeout) {
            Ok(out) => out
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                tracing::debug!(repo = %repo.display(), error = %e, "git log failed");
                Vec::new()
            }
        }
    }
}

impl Default for GitScanner {
    fn default() -> Self {
        Self::from_config(&CommandsConfig::default())
    }
}

impl HistorySource for GitScanner {
    fn commits_since(&self, repo: &Path, since: &str) -> Vec<String> {
        let since = if since.trim().is_empty() {
            DEFAULT_SINCE
        } else {
            since.trim()
        };
        self.log(repo, vec![format!("--since={since}")])
    }

    fn commits_between(&self, repo: &Path, since: NaiveDate, until: NaiveDate) -> Vec<String> {
        self.log(
            repo,
            vec![
                format!("--since={} 00:00", since.format("%Y-%m-%d")),
                format!("--until={} 00:00", until.format("%Y-%m-%d")),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
