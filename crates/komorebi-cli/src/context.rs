use anyhow::Context as _;
use chrono::{DateTime, FixedOffset, Local};
use komorebi_core::calendar::{self, EventSource};
use komorebi_core::config::{Config, WarnLevel};
use komorebi_core::git::{GitScanner, HistorySource};
use komorebi_core::memory::MemoryStore;
use komorebi_core::planning::Planner;
use komorebi_core::skills::SkillSet;
use komorebi_core::store::RecordStore;
use std::path::{Path, PathBuf};

/// Everything a tool or subcommand needs: loaded config, the stores under
/// the data directory, the git and calendar sources, and the skill files.
pub struct ToolContext {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
    pub store: RecordStore,
    pub memory: MemoryStore,
    pub history: Box<dyn HistorySource>,
    pub calendar: Box<dyn EventSource>,
    pub skills: SkillSet,
}

impl ToolContext {
    pub fn load(root: &Path, config_path: &Path) -> anyhow::Result<Self> {
        let config = Config::load(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        for w in config.validate() {
            match w.level {
                WarnLevel::Error => tracing::error!(path = %config_path.display(), "{}", w.message),
                WarnLevel::Warning => tracing::warn!(path = %config_path.display(), "{}", w.message),
            }
        }
        Ok(Self::new(root, config_path, config))
    }

    pub fn new(root: &Path, config_path: &Path, config: Config) -> Self {
        let data_dir = config.resolve_data_dir(root);
        tracing::debug!(data_dir = %data_dir.display(), "data directory");
        Self {
            root: root.to_path_buf(),
            config_path: config_path.to_path_buf(),
            store: RecordStore::new(&data_dir),
            memory: MemoryStore::for_data_dir(&data_dir),
            history: Box::new(GitScanner::from_config(&config.commands)),
            calendar: calendar::from_config(&config),
            skills: SkillSet::for_root(root),
            config,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.store.data_dir()
    }

    pub fn planner(&self) -> Planner<'_> {
        Planner::new(
            &self.store,
            self.history.as_ref(),
            self.calendar.as_ref(),
            &self.config,
        )
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use komorebi_core::calendar::NoCalendar;
    use tempfile::TempDir;

    /// A context rooted in a temp dir with git and calendar switched off.
    pub(crate) fn context(dir: &TempDir) -> ToolContext {
        let mut config = Config::default();
        config.calendar.enabled = false;
        config.commands.git = "komorebi-test-no-such-git".to_string();
        let mut ctx = ToolContext::new(
            dir.path(),
            &dir.path().join("config/settings.yaml"),
            config,
        );
        ctx.calendar = Box::new(NoCalendar);
        ctx
    }

    pub(crate) fn write_project(dir: &TempDir, id: &str, text: &str) {
        let path = dir.path().join("data/projects").join(format!("{id}.md"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    pub(crate) fn project(name: &str, status: &str, priority: i64, task: &str) -> String {
        format!(
            "---\nname: {name}\nstatus: {status}\npriority: {priority}\nstarted: 2025-01-01\n---\n\n# {name}\n\n## 目標\n\n完成 {name}\n\n## 當前進度\n\n- [x] 初始設定\n- [ ] {task}\n"
        )
    }

    #[test]
    fn data_dir_is_relative_to_root() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        assert_eq!(ctx.data_dir(), dir.path().join("data"));
    }

    #[test]
    fn missing_config_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::load(dir.path(), &dir.path().join("config/settings.yaml")).unwrap();
        assert_eq!(ctx.config.planning.work_hours, 8.0);
    }

    #[test]
    fn broken_config_is_reported_with_its_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "data_dir: [unclosed").unwrap();
        let err = ToolContext::load(dir.path(), &path).err().unwrap();
        assert!(format!("{err:#}").contains("settings.yaml"));
    }
}
