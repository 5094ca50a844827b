//! Daily planning, end-of-day review and weekly git summaries.
//!
//! The planner only composes other parts: project records from the
//! [`RecordStore`], commits from a [`HistorySource`], events from an
//! [`EventSource`]. Clock time is always passed in.

use crate::calendar::{CalendarEvent, EventSource};
use crate::config::Config;
use crate::document::{Body, Document, Section};
use crate::error::{KomorebiError, Result};
use crate::frontmatter::Frontmatter;
use crate::git::{self, HistorySource};
use crate::io;
use crate::paths;
use crate::store::{Record, RecordStore};
use crate::types::Collection;
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, SecondsFormat};
use serde::Serialize;
use serde_yaml::Value;
use std::path::PathBuf;

/// Share of the working window kept free for interruptions.
pub const BUFFER_RATIO: f64 = 0.3;

pub const SECTION_HIGHLIGHT: &str = "Highlight";
pub const SECTION_SCHEDULE: &str = "行程";
pub const SECTION_TASKS: &str = "今日計畫";
pub const SECTION_PROJECTS: &str = "專案進度";
pub const SECTION_TIME: &str = "時間建議";
pub const SECTION_NOTES: &str = "筆記";
pub const SECTION_REVIEW: &str = "日終回顧";
pub const SECTION_PROGRESS: &str = "當前進度";
pub const SECTION_LOG: &str = "進度日誌";
pub const SECTION_GIT_ACTIVITY: &str = "Git Activity";

const WEEKDAYS: [&str; 7] = ["一", "二", "三", "四", "五", "六", "日"];
const PLACEHOLDER: &str = "(待填寫)";

/// Chinese weekday character, Monday = 一.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

/// Lines recommending how to split `work_hours` between focused work and buffer.
pub fn time_advice(work_hours: f64) -> Vec<String> {
    let buffer = work_hours * BUFFER_RATIO;
    let focus = work_hours - buffer;
    vec![
        format!("- 工作時間: {} 小時", hours(work_hours)),
        format!("- 深度工作: 約 {} 小時", hours(focus)),
        format!(
            "- 緩衝時間: 約 {} 小時 ({:.0}%)",
            hours(buffer),
            BUFFER_RATIO * 100.0
        ),
        "- 專注於 Highlight，其他任務為次要".to_string(),
    ]
}

fn hours(h: f64) -> String {
    let s = format!("{h:.1}");
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

fn timestamp(now: &DateTime<FixedOffset>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, false)
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "project", rename_all = "snake_case")]
pub enum HighlightSource {
    Caller,
    Project(String),
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub highlight: Option<String>,
    pub highlight_source: HighlightSource,
    pub active_projects: usize,
    pub events: usize,
    pub calendar_error: Option<String>,
}

impl PlanOutcome {
    pub fn summary(&self) -> String {
        let mut out = vec![
            "## 今日計畫已建立".to_string(),
            String::new(),
            format!("**日期**: {} ({})", self.date, weekday_name(self.date)),
        ];
        match (&self.highlight, &self.highlight_source) {
            (Some(h), HighlightSource::Project(p)) => {
                out.push(format!("**Highlight**: {h} (取自專案 {p})"))
            }
            (Some(h), _) => out.push(format!("**Highlight**: {h}")),
            (None, _) => out.push(
                "**Highlight**: 尚未決定。今天最重要的一件事是什麼？".to_string(),
            ),
        }
        out.push(format!("**Active 專案**: {} 個", self.active_projects));
        out.push(format!("**行程**: {} 個", self.events));
        if let Some(e) = &self.calendar_error {
            out.push(format!("**行事曆**: 無法讀取 ({e})"));
        }
        out.push(format!("**檔案**: {}", self.path.display()));
        out.push(String::new());
        out.push("記得專注於 Highlight，保持 30% 緩衝時間！".to_string());
        out.join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectCommits {
    pub project: String,
    pub commits: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndOfDayOutcome {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub projects: Vec<ProjectCommits>,
    /// Per-project problems that did not stop the review.
    pub warnings: Vec<String>,
}

impl EndOfDayOutcome {
    pub fn total_commits(&self) -> usize {
        self.projects.iter().map(|p| p.commits.len()).sum()
    }

    pub fn summary(&self) -> String {
        let mut out = vec![
            "## 日終回顧完成".to_string(),
            String::new(),
            format!("**專案 commits**: {} 個專案", self.projects.len()),
            format!("**總 commits**: {} 筆", self.total_commits()),
            format!("**檔案已更新**: {}", self.path.display()),
            String::new(),
        ];
        out.extend(commit_lines(&self.projects));
        if !self.warnings.is_empty() {
            out.push(String::new());
            out.push("**警告**:".to_string());
            out.extend(self.warnings.iter().map(|w| format!("- {w}")));
        }
        out.push(String::new());
        out.push("辛苦了，好好休息！".to_string());
        out.join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub path: PathBuf,
    pub created: bool,
    pub projects: Vec<ProjectCommits>,
}

impl ReviewOutcome {
    pub fn summary(&self) -> String {
        let total: usize = self.projects.iter().map(|p| p.commits.len()).sum();
        let verb = if self.created { "已建立" } else { "已更新" };
        let mut out = vec![
            format!("## 週回顧 {} {verb}", self.id),
            String::new(),
            format!("**期間**: {} ~ {}", self.from, self.to),
            format!("**總 commits**: {total} 筆"),
            format!("**檔案**: {}", self.path.display()),
            String::new(),
        ];
        out.extend(activity_lines(&self.projects));
        out.join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityOutcome {
    pub project: String,
    pub repo: PathBuf,
    pub since: String,
    pub commits: Vec<String>,
}

impl ActivityOutcome {
    pub fn summary(&self) -> String {
        if self.commits.is_empty() {
            return format!("{} 自 {} 以來沒有 commits。", self.project, self.since);
        }
        let mut out = vec![
            format!("## {} ({} 以來 {} 筆 commits)", self.project, self.since, self.commits.len()),
            String::new(),
        ];
        out.extend(self.commits.iter().map(|c| format!("- {c}")));
        out.join("\n")
    }
}

fn commit_lines(projects: &[ProjectCommits]) -> Vec<String> {
    let lines: Vec<String> = projects
        .iter()
        .flat_map(|p| p.commits.iter().map(move |c| format!("- {}: {c}", p.project)))
        .collect();
    if lines.is_empty() {
        vec!["- (今日無 commits)".to_string()]
    } else {
        lines
    }
}

fn activity_lines(projects: &[ProjectCommits]) -> Vec<String> {
    let mut out = Vec::new();
    for p in projects.iter().filter(|p| !p.commits.is_empty()) {
        if !out.is_empty() {
            out.push(String::new());
        }
        out.push(format!("### {}", p.project));
        out.extend(p.commits.iter().map(|c| format!("- {c}")));
    }
    if out.is_empty() {
        out.push("(本週無 commits)".to_string());
    }
    out
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

pub struct Planner<'a> {
    store: &'a RecordStore,
    history: &'a dyn HistorySource,
    calendar: &'a dyn EventSource,
    config: &'a Config,
}

impl<'a> Planner<'a> {
    pub fn new(
        store: &'a RecordStore,
        history: &'a dyn HistorySource,
        calendar: &'a dyn EventSource,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            history,
            calendar,
            config,
        }
    }

    /// Active project records, most important first.
    fn active_projects(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for summary in self.store.list(Collection::Projects)? {
            if !summary.is_active() {
                continue;
            }
            match self.store.load(Collection::Projects, &summary.id) {
                Ok(r) => records.push(r),
                Err(e) => tracing::warn!(id = %summary.id, error = %e, "skipping unreadable project"),
            }
        }
        Ok(records)
    }

    /// The record's `repo`, or the path configured for it under `projects:`.
    fn repo_for(&self, record: &Record) -> Option<PathBuf> {
        record
            .repo()
            .map(|r| io::expand_home(&r))
            .or_else(|| self.config.active_project_path(&record.name()))
            .or_else(|| self.config.active_project_path(&record.id))
    }

    // -----------------------------------------------------------------------
    // plan_today
    // -----------------------------------------------------------------------

    pub fn plan_today(
        &self,
        now: DateTime<FixedOffset>,
        highlight: Option<&str>,
        tasks: &[String],
    ) -> Result<PlanOutcome> {
        let date = now.date_naive();
        let id = paths::daily_id(date);
        if self.store.exists(Collection::Daily, &id) {
            return Err(KomorebiError::RecordExists {
                collection: Collection::Daily.to_string(),
                id,
            });
        }

        let projects = self.active_projects()?;

        let caller = highlight.map(str::trim).filter(|h| !h.is_empty());
        let (highlight, highlight_source) = match caller {
            Some(h) => (Some(h.to_string()), HighlightSource::Caller),
            None => projects
                .iter()
                .find_map(|p| {
                    p.doc
                        .body
                        .open_tasks()
                        .into_iter()
                        .next()
                        .map(|t| (Some(t), HighlightSource::Project(p.name())))
                })
                .unwrap_or((None, HighlightSource::None)),
        };

        let (events, calendar_error) = if self.calendar.is_enabled() {
            match self.calendar.events(date, 1) {
                Ok(events) => (events, None),
                Err(e) => {
                    tracing::warn!(error = %e, "calendar unavailable, planning without events");
                    (Vec::new(), Some(e.to_string()))
                }
            }
        } else {
            (Vec::new(), None)
        };

        let stamp = timestamp(&now);
        let frontmatter = Frontmatter::from_pairs([
            ("date", Value::String(id.clone())),
            ("highlight", Value::String(highlight.clone().unwrap_or_default())),
            ("created_at", Value::String(stamp.clone())),
            ("updated_at", Value::String(stamp)),
        ]);
        let body = self.daily_body(date, highlight.as_deref(), tasks, &projects, &events);
        let text = Document::new(frontmatter, body).render();

        let path = self.store.create(Collection::Daily, &id, &text)?;
        tracing::info!(date = %id, highlight = ?highlight, events = events.len(), "daily plan created");

        Ok(PlanOutcome {
            date,
            path,
            highlight,
            highlight_source,
            active_projects: projects.len(),
            events: events.len(),
            calendar_error,
        })
    }

    fn daily_body(
        &self,
        date: NaiveDate,
        highlight: Option<&str>,
        tasks: &[String],
        projects: &[Record],
        events: &[CalendarEvent],
    ) -> Body {
        let mut lines = vec![
            format!("# {} ({})", paths::daily_id(date), weekday_name(date)),
            String::new(),
            format!("## {SECTION_HIGHLIGHT}"),
            highlight
                .map(str::to_string)
                .unwrap_or_else(|| "(待填寫：今天最重要的一件事)".to_string()),
            String::new(),
            format!("## {SECTION_SCHEDULE}"),
        ];
        if events.is_empty() {
            let none = if self.calendar.is_enabled() { "(無行程)" } else { "(行事曆未啟用)" };
            lines.push(none.to_string());
        } else {
            lines.extend(events.iter().map(CalendarEvent::line));
        }

        lines.push(String::new());
        lines.push(format!("## {SECTION_TASKS}"));
        let tasks: Vec<&str> = tasks.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
        if tasks.is_empty() {
            lines.push(format!("- [ ] {PLACEHOLDER}"));
        } else {
            lines.extend(tasks.iter().map(|t| format!("- [ ] {t}")));
        }

        lines.push(String::new());
        lines.push(format!("## {SECTION_PROJECTS}"));
        if projects.is_empty() {
            lines.push("(無 active 專案)".to_string());
        }
        for p in projects {
            let next = p.doc.body.open_tasks().into_iter().next();
            lines.push(format!("### {}", p.name()));
            lines.push(format!("- 優先度: {}", p.priority()));
            lines.push(format!("- 下一步: {}", next.as_deref().unwrap_or(PLACEHOLDER)));
            lines.push(String::new());
        }
        if !projects.is_empty() {
            lines.pop();
        }

        lines.push(String::new());
        lines.push(format!("## {SECTION_TIME}"));
        lines.extend(time_advice(self.config.planning.work_hours));
        lines.push(String::new());
        lines.push(format!("## {SECTION_NOTES}"));
        lines.push(String::new());
        lines.push(format!("## {SECTION_REVIEW}"));
        lines.push("(待今日結束時填寫)".to_string());

        Body::parse(&lines)
    }

    // -----------------------------------------------------------------------
    // get_today
    // -----------------------------------------------------------------------

    /// Text of the daily note for `date`, `None` if it was never planned.
    pub fn get_today(&self, date: NaiveDate) -> Result<Option<String>> {
        match self.store.read(Collection::Daily, &paths::daily_id(date)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // end_of_day
    // -----------------------------------------------------------------------

    pub fn end_of_day(
        &self,
        now: DateTime<FixedOffset>,
        notes: Option<&str>,
    ) -> Result<EndOfDayOutcome> {
        let date = now.date_naive();
        let id = paths::daily_id(date);
        let mut daily = self.store.load(Collection::Daily, &id)?;

        let mut projects = Vec::new();
        let mut warnings = Vec::new();
        for record in self.active_projects()? {
            let Some(repo) = self.repo_for(&record) else {
                continue;
            };
            let commits = self.history.commits_since(&repo, git::TODAY);
            if commits.is_empty() {
                continue;
            }
            if let Err(e) = self.write_log_entry(&record, &id, &commits) {
                tracing::warn!(project = %record.id, error = %e, "progress log not updated");
                warnings.push(format!("{}: {e}", record.name()));
            }
            projects.push(ProjectCommits {
                project: record.name(),
                commits,
            });
        }

        let notes = notes.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("(無)");
        let mut review = vec!["### Git Commits".to_string()];
        review.extend(commit_lines(&projects));
        review.push(String::new());
        review.push("### 筆記".to_string());
        review.push(notes.to_string());
        review.push(String::new());
        review.push("### 更新時間".to_string());
        review.push(now.format("%H:%M").to_string());

        daily.doc.body.upsert_section(SECTION_REVIEW, &review.join("\n"))?;
        daily
            .doc
            .frontmatter_mut()
            .set("updated_at", Value::String(timestamp(&now)))
            .map_err(KomorebiError::Validation)?;
        self.store.save(&daily)?;
        tracing::info!(date = %id, projects = projects.len(), "end of day recorded");

        Ok(EndOfDayOutcome {
            date,
            path: daily.path,
            projects,
            warnings,
        })
    }

    /// Upsert a `### <date>` entry inside the project's progress log.
    fn write_log_entry(&self, record: &Record, date_id: &str, commits: &[String]) -> Result<()> {
        let existing = record.doc.body.section_text(SECTION_LOG).unwrap_or_default();
        let entry: Vec<String> = commits.iter().map(|c| format!("- {c}")).collect();
        let content = upsert_entry(&existing, date_id, entry);
        self.store
            .update_section(Collection::Projects, &record.id, SECTION_LOG, &content)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // weekly_review
    // -----------------------------------------------------------------------

    pub fn weekly_review(&self, now: DateTime<FixedOffset>) -> Result<ReviewOutcome> {
        let date = now.date_naive();
        let from = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        let until = date + Days::new(1);

        let mut projects = Vec::new();
        for record in self.active_projects()? {
            let Some(repo) = self.repo_for(&record) else {
                continue;
            };
            projects.push(ProjectCommits {
                project: record.name(),
                commits: self.history.commits_between(&repo, from, until),
            });
        }
        let activity = activity_lines(&projects).join("\n");

        let id = paths::weekly_review_id(date);
        let created = !self.store.exists(Collection::Reviews, &id);
        let path = if created {
            let frontmatter = Frontmatter::from_pairs([
                ("week", Value::String(id.clone())),
                ("from", Value::String(paths::daily_id(from))),
                ("to", Value::String(paths::daily_id(date))),
                ("created_at", Value::String(timestamp(&now))),
            ]);
            let mut lines = vec![
                format!("# 週回顧 {id} ({from} ~ {date})"),
                String::new(),
                format!("## {SECTION_GIT_ACTIVITY}"),
            ];
            lines.extend(activity.lines().map(str::to_string));
            lines.push(String::new());
            lines.push("## 回顧".to_string());
            lines.push(PLACEHOLDER.to_string());
            let text = Document::new(frontmatter, Body::parse(&lines)).render();
            self.store.create(Collection::Reviews, &id, &text)?
        } else {
            self.store
                .update_section(Collection::Reviews, &id, SECTION_GIT_ACTIVITY, &activity)?;
            paths::record_path(self.store.data_dir(), Collection::Reviews, &id)
        };
        tracing::info!(week = %id, created, "weekly review written");

        Ok(ReviewOutcome {
            id,
            from,
            to: date,
            path,
            created,
            projects,
        })
    }

    // -----------------------------------------------------------------------
    // project_activity
    // -----------------------------------------------------------------------

    pub fn project_activity(&self, name: &str, since: Option<&str>) -> Result<ActivityOutcome> {
        let record = self.store.load(Collection::Projects, name)?;
        let repo = self.repo_for(&record).ok_or_else(|| {
            KomorebiError::Validation(format!(
                "project '{}' has no repo path in its record or the config",
                record.name()
            ))
        })?;
        let since = since
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(git::DEFAULT_SINCE)
            .to_string();
        let commits = self.history.commits_since(&repo, &since);
        Ok(ActivityOutcome {
            project: record.name(),
            repo,
            since,
            commits,
        })
    }
}

/// Replace or append the `### <title>` entry within a section's content.
fn upsert_entry(existing: &str, title: &str, entry: Vec<String>) -> String {
    let lines: Vec<&str> = existing.lines().collect();
    let mut body = Body::parse(&lines);
    match body
        .sections
        .iter()
        .position(|s| s.level == 3 && s.title.trim() == title)
    {
        Some(idx) => {
            let mut entry = entry;
            if idx + 1 < body.sections.len() {
                entry.push(String::new());
            }
            body.sections[idx].lines = entry;
        }
        None => {
            let tail = body.sections.last_mut().map(|s| &mut s.lines).unwrap_or(&mut body.preamble);
            if tail.last().map(|l| !l.trim().is_empty()).unwrap_or(false) {
                tail.push(String::new());
            }
            let mut section = Section::new(3, title);
            section.lines = entry;
            body.sections.push(section);
        }
    }
    body.render_lines().join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
