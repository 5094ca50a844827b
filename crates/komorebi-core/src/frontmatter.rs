//! YAML frontmatter kept as both raw lines and a parsed mapping.
//!
//! Reads go through the parsed [`serde_yaml::Mapping`] (ordered, loosely
//! typed). Scalar edits rewrite only the line that holds the key, so keys a
//! person added by hand keep their exact spelling, quoting and comments.

use serde_yaml::{Mapping, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    lines: Vec<String>,
    map: Mapping,
}

impl Frontmatter {
    /// Parse the lines between the `---` fences.
    pub fn parse(lines: Vec<String>) -> Result<Self, String> {
        let map = parse_mapping(&lines)?;
        Ok(Self { lines, map })
    }

    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            map: Mapping::new(),
        }
    }

    /// Build frontmatter from ordered key/value pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut map = Mapping::new();
        for (k, v) in pairs {
            map.insert(Value::String(k.into()), v);
        }
        let lines = render_mapping(&map);
        Self { lines, map }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn mapping(&self) -> &Mapping {
        &self.map
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// String view of a scalar value. Numbers and booleans are stringified.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Set a scalar key, touching only the line that holds it.
    ///
    /// A missing key is appended as a new last line. If line-level editing
    /// cannot produce valid YAML (quoted keys, flow mappings), the whole block
    /// is re-serialised from the parsed mapping instead.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), String> {
        if matches!(value, Value::Mapping(_) | Value::Sequence(_) | Value::Tagged(_)) {
            return Err(format!("frontmatter key '{key}' only accepts scalar values"));
        }
        let rendered = render_scalar(&value)?;
        let new_line = format!("{key}: {rendered}");

        let mut lines = self.lines.clone();
        match find_key_line(&lines, key) {
            Some(idx) => {
                let end = continuation_end(&lines, idx);
                lines.splice(idx..end, std::iter::once(new_line));
            }
            None => lines.push(new_line),
        }

        match parse_mapping(&lines) {
            Ok(map) if map.get(key) == Some(&value) => {
                self.lines = lines;
                self.map = map;
            }
            _ => {
                tracing::debug!(key, "frontmatter line edit fell back to full re-serialisation");
                self.map.insert(Value::String(key.to_string()), value);
                self.lines = render_mapping(&self.map);
            }
        }
        Ok(())
    }
}

fn parse_mapping(lines: &[String]) -> Result<Mapping, String> {
    let text = lines.join("\n");
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Mapping(m)) => Ok(m),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err("frontmatter is not a key-value mapping".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn render_mapping(map: &Mapping) -> Vec<String> {
    if map.is_empty() {
        return Vec::new();
    }
    serde_yaml::to_string(map)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn render_scalar(value: &Value) -> Result<String, String> {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .map_err(|e| e.to_string())
}

/// Index of the top-level line declaring `key`.
fn find_key_line(lines: &[String], key: &str) -> Option<usize> {
    lines.iter().position(|line| {
        line.strip_prefix(key)
            .map(|rest| rest.starts_with(':'))
            .unwrap_or(false)
    })
}

/// One past the last line belonging to the value that starts at `idx`
/// (indented or list continuation lines).
fn continuation_end(lines: &[String], idx: usize) -> usize {
    let mut end = idx + 1;
    while end < lines.len() {
        let line = &lines[end];
        let continues = line.starts_with(' ') || line.starts_with('\t') || line.starts_with("- ");
        if !continues {
            break;
        }
        end += 1;
    }
    end
}
