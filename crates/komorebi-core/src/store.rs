use crate::document::Document;
use crate::error::{KomorebiError, Result};
use crate::io;
use crate::paths;
use crate::types::{Collection, ProjectStatus};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Priority assigned to records that do not declare one.
pub const DEFAULT_PRIORITY: i64 = 999;

// ---------------------------------------------------------------------------
// RecordSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    /// File stem; the identifier used to address the record.
    pub id: String,
    /// Frontmatter `name`, falling back to the identifier.
    pub name: String,
    /// Raw `status` value as written, if any.
    pub status: Option<String>,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Parse failure for files whose frontmatter could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordSummary {
    pub fn parsed_status(&self) -> Option<ProjectStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_active(&self) -> bool {
        self.parsed_status() == Some(ProjectStatus::Active)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A record read from disk, plus the modification time observed when it was
/// read. [`RecordStore::save`] refuses to overwrite a file that changed since.
#[derive(Debug, Clone)]
pub struct Record {
    pub collection: Collection,
    pub id: String,
    pub path: PathBuf,
    pub doc: Document,
    snapshot: Option<SystemTime>,
}

impl Record {
    pub fn name(&self) -> String {
        self.doc.field("name").unwrap_or_else(|| self.id.clone())
    }

    pub fn status(&self) -> Option<ProjectStatus> {
        self.doc.field("status").and_then(|s| s.parse().ok())
    }

    pub fn priority(&self) -> i64 {
        self.doc
            .frontmatter
            .as_ref()
            .and_then(|f| f.get_i64("priority"))
            .unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn repo(&self) -> Option<String> {
        self.doc.field("repo").filter(|r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub id: String,
    pub name: String,
    pub old: Option<String>,
    pub new: ProjectStatus,
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Markdown+frontmatter records under `<data_dir>/<collection>/<id>.md`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
}

impl RecordStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn collection_dir(&self, collection: Collection) -> PathBuf {
        paths::collection_dir(&self.data_dir, collection)
    }

    /// Summaries of every record in `collection`, sorted by priority then id.
    ///
    /// A collection directory that does not exist yet is simply empty.
    pub fn list(&self, collection: Collection) -> Result<Vec<RecordSummary>> {
        let mut summaries = Vec::new();
        for (id, path) in self.record_files(collection)? {
            let summary = match std::fs::read_to_string(&path) {
                Ok(text) => summarize(&id, &text),
                Err(e) => broken_summary(&id, e.to_string()),
            };
            summaries.push(summary);
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for s in &summaries {
            if let Some(other) = seen.insert(s.name.to_lowercase(), &s.id) {
                tracing::warn!(
                    collection = %collection,
                    name = %s.name,
                    first = other,
                    second = %s.id,
                    "duplicate record name"
                );
            }
        }

        summaries.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    /// Identifiers of every record in `collection`, sorted.
    pub fn ids(&self, collection: Collection) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .record_files(collection)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn exists(&self, collection: Collection, id: &str) -> bool {
        self.resolve(collection, id).is_ok()
    }

    /// Raw text of a record, frontmatter included.
    pub fn read(&self, collection: Collection, id: &str) -> Result<String> {
        let path = self.resolve(collection, id)?;
        Ok(std::fs::read_to_string(path)?)
    }

    pub fn load(&self, collection: Collection, id: &str) -> Result<Record> {
        let path = self.resolve(collection, id)?;
        let snapshot = io::modified_at(&path)?;
        let text = std::fs::read_to_string(&path)?;
        let doc = Document::parse(&text).map_err(|reason| KomorebiError::InvalidFrontmatter {
            path: path.display().to_string(),
            reason,
        })?;
        let id = file_stem(&path).unwrap_or_else(|| id.to_string());
        Ok(Record {
            collection,
            id,
            path,
            doc,
            snapshot,
        })
    }

    /// Write a record back, refusing if the file changed since it was loaded.
    pub fn save(&self, record: &Record) -> Result<()> {
        if record.path.exists() {
            let current = io::modified_at(&record.path)?;
            if record.snapshot.is_some() && current != record.snapshot {
                return Err(KomorebiError::Conflict {
                    path: record.path.display().to_string(),
                });
            }
        }
        io::atomic_write(&record.path, record.doc.render().as_bytes())?;
        tracing::debug!(path = %record.path.display(), "record saved");
        Ok(())
    }

    /// Create a new record from full text. Fails if it already exists.
    pub fn create(&self, collection: Collection, id: &str, text: &str) -> Result<PathBuf> {
        paths::validate_id(id)?;
        if self.exists(collection, id) {
            return Err(KomorebiError::RecordExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let path = paths::record_path(&self.data_dir, collection, id);
        Document::parse(text).map_err(|reason| KomorebiError::InvalidFrontmatter {
            path: path.display().to_string(),
            reason,
        })?;
        io::atomic_write(&path, text.as_bytes())?;
        tracing::info!(collection = %collection, id, "record created");
        Ok(path)
    }

    /// Replace (or append) a body section. Frontmatter is not touched.
    /// Returns `true` if an existing section was replaced.
    pub fn update_section(
        &self,
        collection: Collection,
        id: &str,
        section: &str,
        content: &str,
    ) -> Result<bool> {
        let mut record = self.load(collection, id)?;
        let replaced = record.doc.body.upsert_section(section, content)?;
        self.save(&record)?;
        tracing::info!(collection = %collection, id = %record.id, section, replaced, "section updated");
        Ok(replaced)
    }

    /// Validate and rewrite only the `status` frontmatter key.
    pub fn update_status(
        &self,
        collection: Collection,
        id: &str,
        status: &str,
    ) -> Result<StatusChange> {
        let new: ProjectStatus = status.trim().parse()?;
        let mut record = self.load(collection, id)?;
        let old = record.doc.field("status");
        record
            .doc
            .frontmatter_mut()
            .set("status", Value::String(new.as_str().to_string()))
            .map_err(KomorebiError::Validation)?;
        self.save(&record)?;
        tracing::info!(collection = %collection, id = %record.id, old = ?old, new = %new, "status updated");
        Ok(StatusChange {
            id: record.id.clone(),
            name: record.name(),
            old,
            new,
        })
    }

    /// Set any scalar frontmatter key, leaving the rest of the file alone.
    pub fn set_field(&self, collection: Collection, id: &str, key: &str, value: Value) -> Result<()> {
        if key == "status" {
            if let Value::String(s) = &value {
                s.parse::<ProjectStatus>()?;
            }
        }
        let mut record = self.load(collection, id)?;
        record
            .doc
            .frontmatter_mut()
            .set(key, value)
            .map_err(KomorebiError::Validation)?;
        self.save(&record)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Find the file for `id`: exact stem, then case-insensitive stem, then
    /// case-insensitive frontmatter `name`.
    fn resolve(&self, collection: Collection, id: &str) -> Result<PathBuf> {
        paths::validate_id(id)?;
        let not_found = || KomorebiError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };

        let exact = paths::record_path(&self.data_dir, collection, id);
        if exact.is_file() {
            return Ok(exact);
        }

        let files = self.record_files(collection)?;
        let wanted = id.trim().to_lowercase();

        let by_stem: Vec<&PathBuf> = files
            .iter()
            .filter(|(stem, _)| stem.to_lowercase() == wanted)
            .map(|(_, p)| p)
            .collect();
        if let Some(path) = single(collection, id, by_stem)? {
            return Ok(path);
        }

        let by_name: Vec<&PathBuf> = files
            .iter()
            .filter(|(_, path)| {
                std::fs::read_to_string(path)
                    .ok()
                    .and_then(|t| Document::parse(&t).ok())
                    .and_then(|d| d.field("name"))
                    .map(|n| n.trim().to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .map(|(_, p)| p)
            .collect();
        single(collection, id, by_name)?.ok_or_else(not_found)
    }

    /// `(stem, path)` of every `*.md` file in the collection directory.
    fn record_files(&self, collection: Collection) -> Result<Vec<(String, PathBuf)>> {
        let dir = self.collection_dir(collection);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_record = entry.file_type()?.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(paths::RECORD_EXT);
            if !is_record {
                continue;
            }
            if let Some(stem) = file_stem(&path) {
                if !stem.starts_with('.') {
                    files.push((stem, path));
                }
            }
        }
        Ok(files)
    }
}

fn single(collection: Collection, id: &str, matches: Vec<&PathBuf>) -> Result<Option<PathBuf>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0].clone())),
        n => Err(KomorebiError::Validation(format!(
            "'{id}' matches {n} records in {collection}; rename one so names are unique"
        ))),
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn summarize(id: &str, text: &str) -> RecordSummary {
    match Document::parse(text) {
        Ok(doc) => {
            let fm = doc.frontmatter.as_ref();
            RecordSummary {
                id: id.to_string(),
                name: doc.field("name").unwrap_or_else(|| id.to_string()),
                status: doc.field("status"),
                priority: fm.and_then(|f| f.get_i64("priority")).unwrap_or(DEFAULT_PRIORITY),
                repo: doc.field("repo").filter(|r| !r.trim().is_empty()),
                error: None,
            }
        }
        Err(reason) => broken_summary(id, reason),
    }
}

fn broken_summary(id: &str, reason: String) -> RecordSummary {
    RecordSummary {
        id: id.to_string(),
        name: id.to_string(),
        status: None,
        priority: DEFAULT_PRIORITY,
        repo: None,
        error: Some(reason),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEMO: &str = "---
name: demo
status: active
priority: 1
started: 2025-01-06
repo: ~/code/demo
owner: me   # hand-added
---
# demo

## 目標
Build it.

## 當前進度
- [ ] first task
";

    fn store_with(files: &[(&str, &str)]) -> (RecordStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let projects = dir.path().join("projects");
        std::fs::create_dir_all(&projects).unwrap();
        for (name, text) in files {
            std::fs::write(projects.join(format!("{name}.md")), text).unwrap();
        }
        (RecordStore::new(dir.path()), dir)
    }

    fn body_of(text: &str) -> String {
        text.splitn(3, "---\n").nth(2).unwrap().to_string()
    }

    #[test]
    fn list_missing_collection_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        for c in Collection::all() {
            assert!(store.list(*c).unwrap().is_empty());
        }
    }

    #[test]
    fn list_empty_collection_is_empty() {
        let (store, _dir) = store_with(&[]);
        assert!(store.list(Collection::Projects).unwrap().is_empty());
    }

    #[test]
    fn list_sorts_by_priority_and_tolerates_broken_files() {
        let (store, _dir) = store_with(&[
            ("b", "---\nname: Beta\nstatus: paused\npriority: 2\n---\n"),
            ("a", "---\nname: Alpha\nstatus: active\npriority: 1\n---\n"),
            ("broken", "---\nname: [unclosed\n---\n"),
            ("bare", "# no frontmatter\n"),
        ]);
        std::fs::write(store.collection_dir(Collection::Projects).join("notes.txt"), "x").unwrap();

        let list = store.list(Collection::Projects).unwrap();
        let ids: Vec<_> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "bare", "broken"]);
        assert_eq!(list[0].name, "Alpha");
        assert!(list[0].is_active());
        assert_eq!(list[1].parsed_status(), Some(ProjectStatus::Paused));
        assert!(list[3].error.is_some());
        assert_eq!(list[2].priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn read_resolves_case_insensitively_and_by_name() {
        let (store, _dir) = store_with(&[
            ("layerwise", "---\nname: LayerWise\nstatus: active\n---\n"),
            ("site", "---\nname: 個人網站\nstatus: paused\n---\n"),
        ]);
        assert!(store.read(Collection::Projects, "LAYERWISE").is_ok());
        let text = store.read(Collection::Projects, "個人網站").unwrap();
        assert!(text.contains("status: paused"));
    }

    #[test]
    fn read_missing_is_not_found() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        let err = store.read(Collection::Projects, "nonexistent").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn read_rejects_path_escape() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        let err = store.read(Collection::Projects, "../projects/demo").unwrap_err();
        assert!(matches!(err, KomorebiError::InvalidIdentifier(_)));
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let (store, _dir) = store_with(&[
            ("one", "---\nname: Same\n---\n"),
            ("two", "---\nname: same\n---\n"),
        ]);
        let err = store.read(Collection::Projects, "same").unwrap_err();
        assert!(matches!(err, KomorebiError::Validation(_)));
    }

    #[test]
    fn update_status_for_every_valid_value() {
        for status in ProjectStatus::all() {
            let (store, _dir) = store_with(&[("demo", DEMO)]);
            let change = store
                .update_status(Collection::Projects, "demo", status.as_str())
                .unwrap();
            assert_eq!(change.old.as_deref(), Some("active"));
            let text = store.read(Collection::Projects, "demo").unwrap();
            assert!(text.contains(&format!("\nstatus: {status}\n")));
            assert_eq!(body_of(&text), body_of(DEMO));
            assert!(text.contains("owner: me   # hand-added"));
            assert_eq!(text.lines().count(), DEMO.lines().count());
        }
    }

    #[test]
    fn update_status_invalid_leaves_file_untouched() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        for bad in ["done", "ACTIVE", "", "active; rm -rf"] {
            let err = store
                .update_status(Collection::Projects, "demo", bad)
                .unwrap_err();
            assert!(matches!(err, KomorebiError::InvalidStatus(_)));
            assert_eq!(store.read(Collection::Projects, "demo").unwrap(), DEMO);
        }
    }

    #[test]
    fn update_status_missing_record_is_not_found() {
        let (store, _dir) = store_with(&[]);
        let err = store
            .update_status(Collection::Projects, "ghost", "paused")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_section_never_touches_frontmatter() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        store
            .update_section(Collection::Projects, "demo", "目標", "Build it well.")
            .unwrap();
        let text = store.read(Collection::Projects, "demo").unwrap();
        let fm_before: Vec<_> = DEMO.lines().take(8).collect();
        let fm_after: Vec<_> = text.lines().take(8).collect();
        assert_eq!(fm_before, fm_after);
        assert!(text.contains("## 目標\nBuild it well.\n\n## 當前進度"));
    }

    #[test]
    fn update_section_twice_is_idempotent() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        for section in ["當前進度", "Blockers"] {
            store
                .update_section(Collection::Projects, "demo", section, "- waiting on API")
                .unwrap();
            let first = store.read(Collection::Projects, "demo").unwrap();
            store
                .update_section(Collection::Projects, "demo", section, "- waiting on API")
                .unwrap();
            assert_eq!(store.read(Collection::Projects, "demo").unwrap(), first);
        }
    }

    #[test]
    fn update_section_appends_new_heading() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        let replaced = store
            .update_section(Collection::Projects, "demo", "Blockers", "none")
            .unwrap();
        assert!(!replaced);
        let text = store.read(Collection::Projects, "demo").unwrap();
        assert!(text.starts_with(DEMO.trim_end()));
        assert_eq!(text.matches("## Blockers").count(), 1);
        assert!(text.ends_with("## Blockers\nnone\n"));
    }

    #[test]
    fn fenced_content_twice_keeps_sibling_sections() {
        let text = format!("{DEMO}\n## Blockers\nnone\n");
        let (store, _dir) = store_with(&[("demo", &text)]);

        let err = store
            .update_section(Collection::Projects, "demo", "目標", "```sh\nmake build")
            .unwrap_err();
        assert!(matches!(err, KomorebiError::Validation(_)));
        assert_eq!(store.read(Collection::Projects, "demo").unwrap(), text);

        let content = "```sh\nmake build\n~~~\n## not a heading\n```";
        store
            .update_section(Collection::Projects, "demo", "目標", content)
            .unwrap();
        let first = store.read(Collection::Projects, "demo").unwrap();
        store
            .update_section(Collection::Projects, "demo", "目標", content)
            .unwrap();
        let second = store.read(Collection::Projects, "demo").unwrap();
        assert_eq!(second, first);
        assert!(second.contains("## 當前進度\n- [ ] first task\n"));
        assert!(second.ends_with("## Blockers\nnone\n"));
    }

    #[test]
    fn update_section_matches_hand_written_closing_hashes() {
        let text = format!("{DEMO}\n## Blockers ##\nold\n");
        let (store, _dir) = store_with(&[("demo", &text)]);
        let replaced = store
            .update_section(Collection::Projects, "demo", "Blockers", "new")
            .unwrap();
        assert!(replaced);
        let out = store.read(Collection::Projects, "demo").unwrap();
        assert!(out.ends_with("## Blockers ##\nnew\n"));
        assert_eq!(out.matches("Blockers").count(), 1);
    }

    #[test]
    fn update_section_missing_record_is_not_found() {
        let (store, _dir) = store_with(&[]);
        let err = store
            .update_section(Collection::Projects, "ghost", "目標", "x")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn save_detects_concurrent_edit() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        let mut record = store.load(Collection::Projects, "demo").unwrap();
        // Someone edits the file by hand after we read it.
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(&record.path, format!("{DEMO}\nhand edit\n")).unwrap();
        let now = SystemTime::now() + std::time::Duration::from_secs(5);
        std::fs::File::options()
            .write(true)
            .open(&record.path)
            .unwrap()
            .set_modified(now)
            .unwrap();

        record.doc.body.upsert_section("目標", "mine").unwrap();
        let err = store.save(&record).unwrap_err();
        assert!(matches!(err, KomorebiError::Conflict { .. }));
        let text = store.read(Collection::Projects, "demo").unwrap();
        assert!(text.contains("hand edit"));
    }

    #[test]
    fn create_refuses_existing() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        let err = store.create(Collection::Projects, "demo", DEMO).unwrap_err();
        assert!(matches!(err, KomorebiError::RecordExists { .. }));
        let path = store
            .create(Collection::Daily, "2025-01-31", "---\ndate: 2025-01-31\n---\n")
            .unwrap();
        assert!(path.ends_with("daily/2025-01-31.md"));
    }

    #[test]
    fn set_field_validates_status() {
        let (store, _dir) = store_with(&[("demo", DEMO)]);
        assert!(store
            .set_field(Collection::Projects, "demo", "status", Value::String("nope".into()))
            .is_err());
        store
            .set_field(Collection::Projects, "demo", "updated_at", Value::String("2025-02-01".into()))
            .unwrap();
        let record = store.load(Collection::Projects, "demo").unwrap();
        assert_eq!(record.doc.field("updated_at").as_deref(), Some("2025-02-01"));
        assert_eq!(record.priority(), 1);
        assert_eq!(record.repo().as_deref(), Some("~/code/demo"));
    }
}
