use super::{optional_str, KomorebiTool};
use crate::context::ToolContext;
use chrono::{NaiveDate, NaiveTime};
use komorebi_core::calendar::NewEvent;
use serde_json::Value;

pub struct AddEventTool;

impl KomorebiTool for AddEventTool {
    fn name(&self) -> &str {
        "add_event"
    }

    fn description(&self) -> &str {
        "Add a new calendar event. Supports timed events and all-day events."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Event title"
                },
                "start_time": {
                    "type": "string",
                    "description": "Start time HH:MM, or \"all_day\""
                },
                "end_time": {
                    "type": "string",
                    "description": "End time HH:MM, defaults to start_time + 1 hour"
                },
                "date": {
                    "type": "string",
                    "description": "Date (YYYY-MM-DD), defaults to today"
                },
                "description": {
                    "type": "string",
                    "description": "Event description"
                },
                "calendar_id": {
                    "type": "string",
                    "description": "Calendar to add to, defaults to calendar.default_calendar"
                }
            },
            "required": ["summary", "start_time"]
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        if !ctx.calendar.is_enabled() {
            return Err(
                "Calendar is disabled. Set calendar.enabled: true in config/settings.yaml."
                    .to_string(),
            );
        }
        let title = optional_str(args, "summary")?
            .ok_or_else(|| "Event summary (title) is required.".to_string())?;
        let start_time = optional_str(args, "start_time")?
            .ok_or_else(|| "Start time is required (HH:MM or 'all_day').".to_string())?;
        let start = if start_time.trim().eq_ignore_ascii_case("all_day") {
            None
        } else {
            Some(parse_time(start_time)?)
        };
        let end = match (start, optional_str(args, "end_time")?) {
            (Some(_), Some(s)) => Some(parse_time(s)?),
            _ => None,
        };
        let date = match optional_str(args, "date")? {
            Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| format!("invalid date '{s}': expected YYYY-MM-DD"))?,
            None => ctx.now().date_naive(),
        };
        let event = NewEvent {
            title: title.trim().to_string(),
            date,
            start,
            end,
            description: optional_str(args, "description")?.map(str::to_string),
            calendar: optional_str(args, "calendar_id")?.map(|s| s.trim().to_string()),
        };
        event.duration_minutes().map_err(|e| e.to_string())?;

        ctx.calendar
            .add_event(&event)
            .map_err(|e| format!("Failed to add event: {e}"))?;

        let when = match (event.start, event.effective_end()) {
            (Some(s), Some(e)) => format!("{} - {}", s.format("%H:%M"), e.format("%H:%M")),
            _ => "all day".to_string(),
        };
        let calendar = event
            .calendar
            .as_deref()
            .unwrap_or(&ctx.config.calendar.default_calendar);
        Ok(format!(
            "## Event Created\n\n**Title**: {}\n**Date**: {}\n**Time**: {when}\n**Calendar**: {calendar}",
            event.title, event.date
        ))
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| format!("invalid time '{s}': expected HH:MM"))
}
