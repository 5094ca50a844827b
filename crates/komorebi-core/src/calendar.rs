//! Calendar agenda and event creation, backed by `gcalcli`.

use crate::config::Config;
use crate::error::{KomorebiError, Result};
use crate::process;
use chrono::{Days, NaiveDate, NaiveTime, TimeDelta};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    /// `None` for all-day events.
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub title: String,
}

impl CalendarEvent {
    /// `- 09:00-10:00 | Standup` or `- all day | Offsite`.
    pub fn line(&self) -> String {
        match (self.start, self.end) {
            (Some(s), Some(e)) => format!("- {}-{} | {}", s.format("%H:%M"), e.format("%H:%M"), self.title),
            (Some(s), None) => format!("- {} | {}", s.format("%H:%M"), self.title),
            _ => format!("- all day | {}", self.title),
        }
    }
}

/// An event to create. `start: None` makes it an all-day event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    /// Defaults to one hour after `start`.
    pub end: Option<NaiveTime>,
    pub description: Option<String>,
    /// Target calendar; the configured default when `None`.
    pub calendar: Option<String>,
}

impl NewEvent {
    /// Event length in minutes, or `None` for all-day events. The end must
    /// fall after the start on the same day.
    pub fn duration_minutes(&self) -> Result<Option<i64>> {
        let Some(start) = self.start else {
            return Ok(None);
        };
        let Some(end) = self.end else {
            return Ok(Some(60));
        };
        let minutes = (end - start).num_minutes();
        if minutes <= 0 {
            return Err(KomorebiError::Validation(format!(
                "end time {} must be after start time {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        Ok(Some(minutes))
    }

    /// End time as created: the given one, or start + 1h.
    pub fn effective_end(&self) -> Option<NaiveTime> {
        let start = self.start?;
        Some(self.end.unwrap_or_else(|| start.overflowing_add_signed(TimeDelta::hours(1)).0))
    }
}

pub trait EventSource {
    /// Events starting on `from` and the following `days - 1` days.
    fn events(&self, from: NaiveDate, days: u32) -> Result<Vec<CalendarEvent>>;

    fn add_event(&self, _event: &NewEvent) -> Result<()> {
        Err(KomorebiError::Validation(
            "this calendar does not accept new events".to_string(),
        ))
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when the calendar is switched off in config.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalendar;

impl EventSource for NoCalendar {
    fn events(&self, _from: NaiveDate, _days: u32) -> Result<Vec<CalendarEvent>> {
        Ok(Vec::new())
    }

    fn add_event(&self, _event: &NewEvent) -> Result<()> {
        Err(KomorebiError::Validation("calendar is disabled".to_string()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct Gcalcli {
    program: String,
    calendar: String,
    timeout: Duration,
}

impl Gcalcli {
    pub fn new(program: impl Into<String>, calendar: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            calendar: calendar.into(),
            timeout,
        }
    }
}

impl EventSource for Gcalcli {
    fn events(&self, from: NaiveDate, days: u32) -> Result<Vec<CalendarEvent>> {
        let until = from
            .checked_add_days(Days::new(u64::from(days.max(1))))
            .ok_or_else(|| KomorebiError::Validation(format!("date range overflows: {from} + {days} days")))?;
        let args = vec![
            "--nocolor".to_string(),
            "--calendar".to_string(),
            self.calendar.clone(),
            "agenda".to_string(),
            "--tsv".to_string(),
            from.format("%Y-%m-%d").to_string(),
            until.format("%Y-%m-%d").to_string(),
        ];
        let out = process::run_bounded(&self.program, &args, None, self.timeout)?;
        Ok(parse_agenda_tsv(&out))
    }

    fn add_event(&self, event: &NewEvent) -> Result<()> {
        let args = add_args(event, &self.calendar)?;
        let out = process::run_bounded(&self.program, &args, None, self.timeout)?;
        tracing::info!(title = %event.title, date = %event.date, "calendar event added");
        tracing::debug!(output = %out.trim(), "gcalcli add");
        Ok(())
    }
}

/// `gcalcli add` arguments for `event`, targeting `default_calendar` unless
/// the event names its own.
pub fn add_args(event: &NewEvent, default_calendar: &str) -> Result<Vec<String>> {
    if event.title.trim().is_empty() {
        return Err(KomorebiError::Validation("event title is required".to_string()));
    }
    let calendar = event.calendar.as_deref().unwrap_or(default_calendar);
    let mut args: Vec<String> = ["--nocolor", "--calendar", calendar, "add", "--noprompt", "--title"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(event.title.trim().to_string());
    match (event.start, event.duration_minutes()?) {
        (Some(start), Some(minutes)) => {
            args.push("--when".to_string());
            args.push(format!("{} {}", event.date.format("%Y-%m-%d"), start.format("%H:%M")));
            args.push("--duration".to_string());
            args.push(minutes.to_string());
        }
        _ => {
            args.push("--allday".to_string());
            args.push("--when".to_string());
            args.push(event.date.format("%Y-%m-%d").to_string());
            args.push("--duration".to_string());
            args.push("1".to_string());
        }
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.trim().is_empty()) {
        args.push("--description".to_string());
        args.push(description.to_string());
    }
    Ok(args)
}

/// Build the event source described by `config.calendar`.
pub fn from_config(config: &Config) -> Box<dyn EventSource> {
    if config.calendar.enabled {
        Box::new(Gcalcli::new(
            config.commands.gcalcli.clone(),
            config.calendar.default_calendar.clone(),
            config.commands.timeout(),
        ))
    } else {
        Box::new(NoCalendar)
    }
}

/// Parse `gcalcli agenda --tsv` output:
/// `start_date \t start_time \t end_date \t end_time \t title`.
/// Header and malformed lines are skipped.
pub fn parse_agenda_tsv(text: &str) -> Vec<CalendarEvent> {
    text.lines()
        .filter_map(|line| {
            let mut cols = line.split('\t');
            let date = NaiveDate::parse_from_str(cols.next()?.trim(), "%Y-%m-%d").ok()?;
            let start = parse_time(cols.next()?);
            let _end_date = cols.next()?;
            let end = parse_time(cols.next()?);
            let title = cols.collect::<Vec<_>>().join("\t").trim().to_string();
            Some(CalendarEvent {
                date,
                start,
                end,
                title: if title.is_empty() { "(no title)".to_string() } else { title },
            })
        })
        .collect()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Markdown agenda for display.
pub fn format_agenda(from: NaiveDate, events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return format!("## {from} - No events\n\nNo events scheduled.");
    }
    let mut lines = vec![format!("## {from} Events"), String::new()];
    let mut current = from;
    for event in events {
        if event.date != current {
            lines.push(String::new());
            lines.push(format!("### {}", event.date));
            current = event.date;
        }
        lines.push(event.line());
    }
    lines.push(String::new());
    lines.push(format!("Total: {} event(s)", events.len()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const TSV: &str = "start_date\tstart_time\tend_date\tend_time\ttitle
2026-01-15\t09:00\t2026-01-15\t10:00\tTeam Standup
2026-01-15\t\t2026-01-16\t\tOffsite
garbage line
2026-01-16\t14:00\t2026-01-16\t15:00\t1:1 with Manager
";

    #[test]
    fn parses_tsv_agenda() {
        let events = parse_agenda_tsv(TSV);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].title, "Team Standup");
        assert_eq!(events[0].line(), "- 09:00-10:00 | Team Standup");
        assert_eq!(events[1].line(), "- all day | Offsite");
        assert_eq!(events[2].date, d("2026-01-16"));
    }

    #[test]
    fn agenda_groups_by_day() {
        let text = format_agenda(d("2026-01-15"), &parse_agenda_tsv(TSV));
        assert!(text.starts_with("## 2026-01-15 Events\n\n- 09:00-10:00 | Team Standup"));
        assert!(text.contains("### 2026-01-16\n- 14:00-15:00 | 1:1 with Manager"));
        assert!(text.ends_with("Total: 3 event(s)"));
    }

    #[test]
    fn empty_agenda() {
        assert_eq!(
            format_agenda(d("2026-01-15"), &[]),
            "## 2026-01-15 - No events\n\nNo events scheduled."
        );
    }

    #[test]
    fn disabled_calendar_has_no_events() {
        let cfg = Config {
            calendar: crate::config::CalendarConfig {
                enabled: false,
                ..Default::default()
            },
            ..Config::default()
        };
        let source = from_config(&cfg);
        assert!(!source.is_enabled());
        assert!(source.events(d("2026-01-15"), 1).unwrap().is_empty());
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn meeting() -> NewEvent {
        NewEvent {
            title: "Design review".into(),
            date: d("2026-01-15"),
            start: Some(t("14:00")),
            end: None,
            description: None,
            calendar: None,
        }
    }

    #[test]
    fn timed_event_defaults_to_one_hour() {
        let event = meeting();
        assert_eq!(event.effective_end(), Some(t("15:00")));
        let args = add_args(&event, "primary").unwrap();
        assert_eq!(
            args,
            [
                "--nocolor", "--calendar", "primary", "add", "--noprompt", "--title",
                "Design review", "--when", "2026-01-15 14:00", "--duration", "60",
            ]
        );
    }

    #[test]
    fn explicit_end_sets_duration() {
        let event = NewEvent {
            end: Some(t("15:30")),
            description: Some("bring notes".into()),
            calendar: Some("work".into()),
            ..meeting()
        };
        let args = add_args(&event, "primary").unwrap();
        assert_eq!(args[2], "work");
        assert!(args.windows(2).any(|w| w == ["--duration", "90"]));
        assert!(args.ends_with(&["--description".to_string(), "bring notes".to_string()]));
    }

    #[test]
    fn all_day_event() {
        let event = NewEvent {
            start: None,
            ..meeting()
        };
        assert_eq!(event.effective_end(), None);
        let args = add_args(&event, "primary").unwrap();
        assert!(args.contains(&"--allday".to_string()));
        assert!(args.windows(2).any(|w| w == ["--when", "2026-01-15"]));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let event = NewEvent {
            end: Some(t("13:00")),
            ..meeting()
        };
        assert!(matches!(add_args(&event, "primary"), Err(KomorebiError::Validation(_))));
        let blank = NewEvent {
            title: "  ".into(),
            ..meeting()
        };
        assert!(add_args(&blank, "primary").is_err());
    }

    #[test]
    fn disabled_calendar_refuses_new_events() {
        assert!(NoCalendar.add_event(&meeting()).is_err());
    }

    #[test]
    fn missing_gcalcli_is_an_error() {
        let cal = Gcalcli::new("komorebi-no-such-gcalcli", "primary", Duration::from_secs(1));
        assert!(cal.events(d("2026-01-15"), 1).is_err());
    }
}
