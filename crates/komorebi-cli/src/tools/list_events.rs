use super::{optional_str, optional_u32, KomorebiTool};
use crate::context::ToolContext;
use chrono::NaiveDate;
use komorebi_core::calendar::format_agenda;
use serde_json::Value;

/// Longest range a single query may cover.
const MAX_DAYS: u32 = 31;

pub struct ListEventsTool;

impl KomorebiTool for ListEventsTool {
    fn name(&self) -> &str {
        "list_events"
    }

    fn description(&self) -> &str {
        "Query calendar events for a date range. Defaults to today's events."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "Start date (YYYY-MM-DD), defaults to today"
                },
                "days": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_DAYS,
                    "description": "Number of days to query, defaults to 1"
                }
            }
        })
    }

    fn call(&self, args: &Value, ctx: &ToolContext) -> Result<String, String> {
        if !ctx.calendar.is_enabled() {
            return Err(
                "Calendar is disabled. Set calendar.enabled: true in config/settings.yaml."
                    .to_string(),
            );
        }
        let date = match optional_str(args, "date")? {
            Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| format!("invalid date '{s}': expected YYYY-MM-DD"))?,
            None => ctx.now().date_naive(),
        };
        let days = optional_u32(args, "days")?.unwrap_or(1);
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(format!("days must be between 1 and {MAX_DAYS}, got {days}"));
        }
        let events = ctx
            .calendar
            .events(date, days)
            .map_err(|e| format!("Calendar query failed: {e}"))?;
        Ok(format_agenda(date, &events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use chrono::NaiveTime;
    use komorebi_core::calendar::{CalendarEvent, EventSource};
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixed(Vec<CalendarEvent>);

    impl EventSource for Fixed {
        fn events(&self, from: NaiveDate, days: u32) -> komorebi_core::Result<Vec<CalendarEvent>> {
            let until = from + chrono::Days::new(u64::from(days));
            Ok(self
                .0
                .iter()
                .filter(|e| e.date >= from && e.date < until)
                .cloned()
                .collect())
        }
    }

    fn standup(date: &str) -> CalendarEvent {
        CalendarEvent {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start: NaiveTime::from_hms_opt(9, 0, 0),
            end: NaiveTime::from_hms_opt(9, 15, 0),
            title: "Standup".into(),
        }
    }

    #[test]
    fn disabled_calendar_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let err = ListEventsTool.call(&json!({}), &ctx).unwrap_err();
        assert!(err.contains("disabled"));
    }

    #[test]
    fn lists_events_in_range() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.calendar = Box::new(Fixed(vec![standup("2026-01-15"), standup("2026-01-16")]));

        let text = ListEventsTool
            .call(&json!({"date": "2026-01-15"}), &ctx)
            .unwrap();
        assert!(text.starts_with("## 2026-01-15 Events"));
        assert!(text.ends_with("Total: 1 event(s)"));

        let text = ListEventsTool
            .call(&json!({"date": "2026-01-15", "days": 2}), &ctx)
            .unwrap();
        assert!(text.contains("### 2026-01-16"));

        let text = ListEventsTool
            .call(&json!({"date": "2026-02-01"}), &ctx)
            .unwrap();
        assert_eq!(text, "## 2026-02-01 - No events\n\nNo events scheduled.");
    }

    #[test]
    fn bad_arguments() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.calendar = Box::new(Fixed(Vec::new()));
        assert!(ListEventsTool.call(&json!({"date": "01/15"}), &ctx).is_err());
        assert!(ListEventsTool.call(&json!({"days": 0}), &ctx).is_err());
        assert!(ListEventsTool.call(&json!({"days": 90}), &ctx).is_err());
    }
}
