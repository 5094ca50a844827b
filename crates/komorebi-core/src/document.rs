//! Markdown record model: optional frontmatter plus a body split into
//! heading-delimited sections.
//!
//! ```text
//! ---            ┐
//! name: demo     │ Frontmatter (raw lines + parsed mapping)
//! ---            ┘
//! # Demo         ┐ preamble is everything before the first heading;
//! ## 目標        │ each heading starts a Section { level, title, lines }
//! ...            ┘
//! ```
//!
//! The body is an ordered `Vec<Section>` rather than a string, so section
//! replace/append is list surgery and text is produced only by [`Document::render`].

use crate::error::{KomorebiError, Result};
use crate::frontmatter::Frontmatter;
use regex::Regex;
use std::sync::OnceLock;

/// Level used for sections appended by [`Body::upsert_section`].
pub const APPENDED_SECTION_LEVEL: usize = 2;

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static OPEN_TASK_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t]*$").unwrap())
}

fn open_task_re() -> &'static Regex {
    OPEN_TASK_RE.get_or_init(|| Regex::new(r"^\s*[-*+]\s+\[ \]\s+(.+?)\s*$").unwrap())
}

/// Level and title of an ATX heading. An optional closing `#` run
/// (`## Blockers ##`) is not part of the title.
fn parse_heading(line: &str) -> Option<(usize, String)> {
    let caps = heading_re().captures(line)?;
    let title = &caps[2];
    let unclosed = title.trim_end_matches('#');
    let title = if unclosed.len() < title.len() && unclosed.ends_with([' ', '\t']) {
        unclosed.trim_end()
    } else {
        title
    };
    Some((caps[1].len(), title.to_string()))
}

/// Fence character and run length of a line opening a fenced code block.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let t = line.trim_start();
    let c = t.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = t.chars().take_while(|x| *x == c).count();
    (run >= 3).then_some((c, run))
}

/// Tracks fenced code blocks line by line. A block closes only on a bare
/// run of its own fence character at least as long as the opener.
#[derive(Debug, Default)]
struct Fences {
    open: Option<(char, usize)>,
}

impl Fences {
    /// Feed one line; true when the line is code or a fence delimiter.
    fn step(&mut self, line: &str) -> bool {
        match self.open {
            None => {
                self.open = fence_marker(line);
                self.open.is_some()
            }
            Some((c, run)) => {
                let t = line.trim();
                if t.len() >= run && t.chars().all(|x| x == c) {
                    self.open = None;
                }
                true
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Section / Body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub level: usize,
    pub title: String,
    /// The heading line exactly as written.
    heading: String,
    pub lines: Vec<String>,
}

impl Section {
    pub fn new(level: usize, title: impl Into<String>) -> Self {
        let title = title.into();
        let heading = format!("{} {}", "#".repeat(level), title);
        Self {
            level,
            title,
            heading,
            lines: Vec::new(),
        }
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub preamble: Vec<String>,
    pub sections: Vec<Section>,
}

impl Body {
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut body = Body::default();
        let mut fences = Fences::default();
        for line in lines {
            let line = line.as_ref();
            let heading = if fences.step(line) {
                None
            } else {
                parse_heading(line)
            };
            match heading {
                Some((level, title)) => body.sections.push(Section {
                    level,
                    title,
                    heading: line.to_string(),
                    lines: Vec::new(),
                }),
                None => match body.sections.last_mut() {
                    Some(section) => section.lines.push(line.to_string()),
                    None => body.preamble.push(line.to_string()),
                },
            }
        }
        body
    }

    pub fn render_lines(&self) -> Vec<String> {
        let mut out = self.preamble.clone();
        for section in &self.sections {
            out.push(section.heading.clone());
            out.extend(section.lines.iter().cloned());
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.preamble.iter().all(|l| l.trim().is_empty()) && self.sections.is_empty()
    }

    /// Index of the first section titled `name`. Exact match on the trimmed
    /// title wins; otherwise a case-insensitive match is accepted.
    pub fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.sections
            .iter()
            .position(|s| s.title.trim() == name)
            .or_else(|| {
                let lower = name.to_lowercase();
                self.sections
                    .iter()
                    .position(|s| s.title.trim().to_lowercase() == lower)
            })
    }

    /// One past the last section nested under section `idx`.
    fn subtree_end(&self, idx: usize) -> usize {
        let level = self.sections[idx].level;
        let mut end = idx + 1;
        while end < self.sections.len() && self.sections[end].level > level {
            end += 1;
        }
        end
    }

    /// Text of a section including its nested subsections, trimmed.
    pub fn section_text(&self, name: &str) -> Option<String> {
        let idx = self.find(name)?;
        let end = self.subtree_end(idx);
        let mut lines = self.sections[idx].lines.clone();
        for sub in &self.sections[idx + 1..end] {
            lines.push(sub.heading.clone());
            lines.extend(sub.lines.iter().cloned());
        }
        Some(lines.join("\n").trim().to_string())
    }

    /// Replace the content of section `name` (up to the next heading of equal
    /// or higher level), or append it as a new `##` section at the end.
    ///
    /// Returns `true` when an existing section was replaced. Repeating the
    /// call with the same arguments yields the same body.
    pub fn upsert_section(&mut self, name: &str, content: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() || name.contains('\n') {
            return Err(KomorebiError::Validation(
                "section name must be a single non-empty line".into(),
            ));
        }

        let found = self.find(name);
        let level = found
            .map(|i| self.sections[i].level)
            .unwrap_or(APPENDED_SECTION_LEVEL);
        let replacement = content_body(content, level)?;

        match found {
            Some(idx) => {
                let end = self.subtree_end(idx);
                let has_following = end < self.sections.len();
                let Body {
                    preamble,
                    mut sections,
                } = replacement;

                let mut own_lines = preamble;
                if has_following {
                    let tail = sections
                        .last_mut()
                        .map(|s| &mut s.lines)
                        .unwrap_or(&mut own_lines);
                    if tail.last().map(|l| !l.trim().is_empty()).unwrap_or(true) {
                        tail.push(String::new());
                    }
                }
                self.sections[idx].lines = own_lines;
                self.sections.splice(idx + 1..end, sections);
                Ok(true)
            }
            None => {
                let tail = self
                    .sections
                    .last_mut()
                    .map(|s| &mut s.lines)
                    .unwrap_or(&mut self.preamble);
                if tail.last().map(|l| !l.trim().is_empty()).unwrap_or(false) {
                    tail.push(String::new());
                }
                let mut section = Section::new(APPENDED_SECTION_LEVEL, name);
                section.lines = replacement.preamble;
                self.sections.push(section);
                self.sections.extend(replacement.sections);
                Ok(false)
            }
        }
    }

    /// Text of every unchecked `- [ ] task` line, in document order.
    pub fn open_tasks(&self) -> Vec<String> {
        let mut tasks = Vec::new();
        let mut fences = Fences::default();
        for line in self.render_lines() {
            if fences.step(&line) {
                continue;
            }
            if let Some(caps) = open_task_re().captures(&line) {
                tasks.push(caps[1].to_string());
            }
        }
        tasks
    }
}

/// Parse replacement content for a section at `level`, rejecting headings
/// that would end the section early and code fences left open, which would
/// swallow every later heading once written.
fn content_body(content: &str, level: usize) -> Result<Body> {
    let lines: Vec<&str> = content.trim_matches('\n').trim_end().lines().collect();
    let mut fences = Fences::default();
    for line in &lines {
        fences.step(line);
    }
    if let Some((c, run)) = fences.open {
        return Err(KomorebiError::Validation(format!(
            "content opens a code fence that is never closed; end it with a {} line",
            c.to_string().repeat(run)
        )));
    }
    let body = Body::parse(&lines);
    if let Some(s) = body.sections.iter().find(|s| s.level <= level) {
        return Err(KomorebiError::Validation(format!(
            "content heading '{}' would split the section; use level {} or deeper",
            s.heading,
            level + 1
        )));
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub frontmatter: Option<Frontmatter>,
    pub body: Body,
    trailing_newline: bool,
}

impl Document {
    pub fn new(frontmatter: Frontmatter, body: Body) -> Self {
        Self {
            frontmatter: Some(frontmatter),
            body,
            trailing_newline: true,
        }
    }

    /// Split `text` into frontmatter and body. Only a missing closing fence or
    /// YAML that is not a mapping is an error.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let lines: Vec<&str> = text.lines().collect();
        let trailing_newline = text.ends_with('\n');

        let opens = lines.first().map(|l| l.trim_end() == "---").unwrap_or(false);
        if !opens {
            return Ok(Self {
                frontmatter: None,
                body: Body::parse(&lines),
                trailing_newline,
            });
        }

        let close = lines
            .iter()
            .skip(1)
            .position(|l| l.trim_end() == "---")
            .map(|i| i + 1)
            .ok_or_else(|| "frontmatter opened with '---' but never closed".to_string())?;

        let fm_lines = lines[1..close].iter().map(|l| l.to_string()).collect();
        let frontmatter = Frontmatter::parse(fm_lines)?;
        Ok(Self {
            frontmatter: Some(frontmatter),
            body: Body::parse(&lines[close + 1..]),
            trailing_newline,
        })
    }

    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        if let Some(fm) = &self.frontmatter {
            lines.push("---".into());
            lines.extend(fm.lines().iter().cloned());
            lines.push("---".into());
        }
        lines.extend(self.body.render_lines());
        let mut out = lines.join("\n");
        if self.trailing_newline && !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Frontmatter, created empty if the file had none.
    pub fn frontmatter_mut(&mut self) -> &mut Frontmatter {
        self.frontmatter.get_or_insert_with(Frontmatter::empty)
    }

    pub fn field(&self, key: &str) -> Option<String> {
        self.frontmatter.as_ref().and_then(|f| f.get_str(key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
