//! Remembered facts: `memory/facts.yaml`, one mapping per category.

use crate::error::{KomorebiError, Result};
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// Preferences and habits of the user.
    User,
    /// Facts about individual projects.
    Projects,
}

impl MemoryCategory {
    pub fn all() -> &'static [MemoryCategory] {
        &[MemoryCategory::User, MemoryCategory::Projects]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemoryCategory::User => "user",
            MemoryCategory::Projects => "projects",
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryCategory {
    type Err = KomorebiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MemoryCategory::User),
            "projects" => Ok(MemoryCategory::Projects),
            _ => Err(KomorebiError::Validation(format!(
                "unknown memory category '{s}': expected user or projects"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::new(paths::memory_path(data_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole category, or a single key within it. `None` when empty or absent.
    pub fn get(&self, category: MemoryCategory, key: Option<&str>) -> Result<Option<Value>> {
        let facts = self.load()?;
        let Some(Value::Mapping(entries)) = facts.get(category.as_str()) else {
            return Ok(None);
        };
        let found = match key {
            Some(k) => entries.get(k).cloned(),
            None => Some(Value::Mapping(entries.clone())),
        };
        Ok(found.filter(|v| !is_empty(v)))
    }

    /// Store `value` under `category/key`, replacing any previous value.
    pub fn remember(&self, category: MemoryCategory, key: &str, value: &str) -> Result<()> {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            return Err(KomorebiError::Validation(
                "both key and value are required".to_string(),
            ));
        }

        let mut facts = self.load()?;
        let slot = facts
            .entry(Value::String(category.as_str().to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !slot.is_mapping() {
            *slot = Value::Mapping(Mapping::new());
        }
        if let Value::Mapping(entries) = slot {
            entries.insert(Value::String(key.to_string()), Value::String(value.to_string()));
        }

        let data = serde_yaml::to_string(&facts)?;
        io::atomic_write(&self.path, data.as_bytes())?;
        tracing::info!(category = %category, key, "fact remembered");
        Ok(())
    }

    fn load(&self) -> Result<Mapping> {
        if !self.path.exists() {
            return Ok(empty_facts());
        }
        let text = std::fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(empty_facts());
        }
        match serde_yaml::from_str::<Value>(&text)? {
            Value::Mapping(m) => Ok(m),
            Value::Null => Ok(empty_facts()),
            _ => Err(KomorebiError::Validation(format!(
                "{} is not a mapping of categories",
                self.path.display()
            ))),
        }
    }
}

fn empty_facts() -> Mapping {
    let mut m = Mapping::new();
    for c in MemoryCategory::all() {
        m.insert(Value::String(c.as_str().to_string()), Value::Mapping(Mapping::new()));
    }
    m
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Render a fact lookup as a Markdown block with the value as YAML.
pub fn render(category: MemoryCategory, key: Option<&str>, value: &Value) -> String {
    let title = match key {
        Some(k) => format!("{category}/{k}"),
        None => category.to_string(),
    };
    let yaml = serde_yaml::to_string(value).unwrap_or_default();
    format!("## {title}\n\n```yaml\n{yaml}```")
}
