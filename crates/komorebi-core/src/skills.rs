//! On-demand guidance files under `.claude/skills/<dir>/SKILL.md`.
//!
//! Only the frontmatter summary goes into the system prompt; the model pulls
//! the full text in with the `load_skill` tool when a topic comes up.

use crate::document::Document;
use crate::error::Result;
use crate::paths;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Longest description excerpt shown in the prompt table.
const SUMMARY_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillInfo {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
}

impl SkillInfo {
    /// First line of the description, cut to [`SUMMARY_CHARS`].
    pub fn summary(&self) -> String {
        self.description
            .trim()
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .chars()
            .take(SUMMARY_CHARS)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkillSet {
    skills: BTreeMap<String, SkillInfo>,
}

impl SkillSet {
    /// Skills of the workspace rooted at `root`.
    pub fn for_root(root: &Path) -> Self {
        Self::discover(&paths::skills_dir(root))
    }

    /// Read the frontmatter of every `<dir>/SKILL.md` below `dir`. `name`
    /// falls back to the directory name. Unreadable or malformed files are
    /// skipped; a missing `dir` yields an empty set.
    pub fn discover(dir: &Path) -> Self {
        let mut skills = BTreeMap::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Self { skills };
        };
        for entry in entries.flatten() {
            let path = entry.path().join(paths::SKILL_FILE);
            if !path.is_file() {
                continue;
            }
            let doc = match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| Document::parse(&text))
            {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping skill");
                    continue;
                }
            };
            let name = doc
                .field("name")
                .unwrap_or_else(|| entry.file_name().to_string_lossy().into_owned());
            let description = doc.field("description").unwrap_or_default();
            skills.insert(
                name.clone(),
                SkillInfo {
                    name,
                    description,
                    path,
                },
            );
        }
        tracing::debug!(dir = %dir.display(), count = skills.len(), "discovered skills");
        Self { skills }
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SkillInfo> {
        self.skills.get(name)
    }

    /// Full SKILL.md text, frontmatter included. `None` for unknown names.
    pub fn load(&self, name: &str) -> Result<Option<String>> {
        match self.skills.get(name) {
            Some(skill) => Ok(Some(std::fs::read_to_string(&skill.path)?)),
            None => Ok(None),
        }
    }

    /// Markdown table for the system prompt; empty when there are no skills.
    pub fn list_prompt(&self) -> String {
        if self.skills.is_empty() {
            return String::new();
        }
        let mut lines = vec![
            "## 可用技能".to_string(),
            String::new(),
            "| 技能 | 說明 |".to_string(),
            "|------|------|".to_string(),
        ];
        for skill in self.skills.values() {
            lines.push(format!("| `{}` | {} |", skill.name, skill.summary()));
        }
        lines.push(String::new());
        lines.push("當對話涉及上述主題時，請呼叫 `load_skill` 工具載入詳細指引。".to_string());
        lines.join("\n")
    }
}
