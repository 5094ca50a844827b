use crate::error::Result;
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProjectEntry
// ---------------------------------------------------------------------------

/// A repository tracked from the config file rather than a project record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// CalendarConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_calendar")]
    pub default_calendar: String,
}

fn default_calendar() -> String {
    "primary".to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_calendar: default_calendar(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlanningConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Length of the working window the buffer recommendation is computed over.
    #[serde(default = "default_work_hours")]
    pub work_hours: f64,
}

fn default_work_hours() -> f64 {
    8.0
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            work_hours: default_work_hours(),
        }
    }
}

// ---------------------------------------------------------------------------
// CommandsConfig
// ---------------------------------------------------------------------------

/// External programs and the bound placed on each invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_gcalcli")]
    pub gcalcli: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_git() -> String {
    "git".to_string()
}

fn default_gcalcli() -> String {
    "gcalcli".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            gcalcli: default_gcalcli(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CommandsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// `config/settings.yaml`. Every key is optional; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectEntry>,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_data_dir() -> String {
    format!("./{}", paths::DEFAULT_DATA_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            projects: BTreeMap::new(),
            calendar: CalendarConfig::default(),
            planning: PlanningConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing or empty file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())
    }

    /// `data_dir` with `~` expanded; relative paths are taken from `root`.
    pub fn resolve_data_dir(&self, root: &Path) -> PathBuf {
        let dir = io::expand_home(&self.data_dir);
        if dir.is_absolute() {
            dir
        } else {
            root.join(dir)
        }
    }

    /// Repository path configured for `name`, if it is marked active.
    pub fn active_project_path(&self, name: &str) -> Option<PathBuf> {
        let wanted = name.to_lowercase();
        self.projects
            .iter()
            .find(|(key, _)| key.to_lowercase() == wanted)
            .map(|(_, entry)| entry)
            .filter(|entry| entry.active && !entry.path.trim().is_empty())
            .map(|entry| io::expand_home(&entry.path))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.data_dir.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "data_dir is empty".to_string(),
            });
        }

        for (name, entry) in &self.projects {
            if entry.path.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("project '{name}' has no path"),
                });
            }
        }

        let hours = self.planning.work_hours;
        if !(hours > 0.0 && hours <= 24.0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("planning.work_hours must be between 0 and 24, got {hours}"),
            });
        }

        if self.commands.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "commands.timeout_secs is 0; using 1 second".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join("settings.yaml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.data_dir, "./data");
        assert!(cfg.calendar.enabled);
        assert_eq!(cfg.calendar.default_calendar, "primary");
        assert_eq!(cfg.commands.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_file_fills_defaults_and_ignores_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(
            &path,
            "data_dir: ~/notes\nprojects:\n  layerwise:\n    path: ~/code/layerwise\n  old:\n    path: /srv/old\n    active: false\ncalendar:\n  enabled: false\n  credentials_path: ~/creds.json\n",
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.data_dir, "~/notes");
        assert!(cfg.projects["layerwise"].active);
        assert!(!cfg.projects["old"].active);
        assert!(!cfg.calendar.enabled);
        assert_eq!(cfg.planning.work_hours, 8.0);
        assert!(cfg.active_project_path("LayerWise").is_some());
        assert!(cfg.active_project_path("old").is_none());
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn relative_data_dir_resolves_against_root() {
        let cfg = Config::default();
        assert_eq!(
            cfg.resolve_data_dir(Path::new("/home/me/assistant")),
            PathBuf::from("/home/me/assistant/./data")
        );
        let cfg = Config {
            data_dir: "/var/komorebi".into(),
            ..Config::default()
        };
        assert_eq!(
            cfg.resolve_data_dir(Path::new("/elsewhere")),
            PathBuf::from("/var/komorebi")
        );
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config/settings.yaml");
        let mut cfg = Config::default();
        cfg.projects.insert(
            "demo".into(),
            ProjectEntry {
                path: "~/code/demo".into(),
                active: true,
            },
        );
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_empty());
        cfg.planning.work_hours = 0.0;
        cfg.commands.timeout_secs = 0;
        cfg.projects.insert(
            "x".into(),
            ProjectEntry {
                path: String::new(),
                active: true,
            },
        );
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));
    }
}
