use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn all() -> &'static [ProjectStatus] {
        &[
            ProjectStatus::Active,
            ProjectStatus::Paused,
            ProjectStatus::Completed,
            ProjectStatus::Archived,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ProjectStatus::Active => "🟢",
            ProjectStatus::Paused => "⏸️",
            ProjectStatus::Completed => "✅",
            ProjectStatus::Archived => "📦",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = crate::error::KomorebiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "paused" => Ok(ProjectStatus::Paused),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            _ => Err(crate::error::KomorebiError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Projects,
    Daily,
    Reviews,
}

impl Collection {
    pub fn all() -> &'static [Collection] {
        &[Collection::Projects, Collection::Daily, Collection::Reviews]
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::Daily => "daily",
            Collection::Reviews => "reviews",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl std::str::FromStr for Collection {
    type Err = crate::error::KomorebiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" | "project" => Ok(Collection::Projects),
            "daily" => Ok(Collection::Daily),
            "reviews" | "review" => Ok(Collection::Reviews),
            _ => Err(crate::error::KomorebiError::Validation(format!(
                "unknown collection '{s}': expected projects, daily or reviews"
            ))),
        }
    }
}
