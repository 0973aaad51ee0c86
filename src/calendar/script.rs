//! Backend that drives the Calendar application through generated
//! AppleScript.
//!
//! User-supplied text reaches a script only through [`quote`]; timestamps are
//! passed as integer components to the `mkdate` handler, never as date
//! literals.

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};
use tracing::debug;

use super::runner::ScriptRunner;
use super::{datetime, resolve_calendar, CalendarBackend, Event, NewEvent, QuerySpec, Timestamp};
use crate::error::{CalendarError, CalendarResult};

const RECORD_SEPARATOR: char = '\u{1e}';
const FIELD_SEPARATOR: char = '\u{1f}';
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HANDLERS: &str = r#"on pad(n)
	return text -2 thru -1 of ("0" & (n as integer))
end pad

on stamp(d)
	return ((year of d) as string) & "-" & my pad(month of d as integer) & "-" & my pad(day of d) & " " & my pad(hours of d) & ":" & my pad(minutes of d) & ":" & my pad(seconds of d)
end stamp

-- Drops the record and field separators from text written by other apps.
on clean(s)
	if s is missing value then return ""
	set saved to AppleScript's text item delimiters
	set AppleScript's text item delimiters to {character id 30, character id 31}
	set parts to text items of (s as text)
	set AppleScript's text item delimiters to ""
	set s to parts as text
	set AppleScript's text item delimiters to saved
	return s
end clean

on mkdate(y, m, d, hh, mm, ss)
	set t to current date
	set day of t to 1
	set year of t to y
	set month of t to m
	set day of t to d
	set time of t to (hh * hours + mm * minutes + ss)
	return t
end mkdate

set RS to character id 30
set US to character id 31
"#;

/// Renders `s` as an AppleScript string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn mkdate(t: &NaiveDateTime) -> String {
    format!(
        "my mkdate({}, {}, {}, {}, {}, {})",
        t.year(),
        t.month(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}

fn local_mkdate(t: &Timestamp) -> String {
    mkdate(&t.naive_local())
}

fn midnight_mkdate(day: NaiveDate) -> String {
    mkdate(&day.and_hms_opt(0, 0, 0).unwrap_or_default())
}

pub fn calendar_names_script() -> String {
    format!(
        r#"{HANDLERS}
set output to ""
tell application "Calendar"
	repeat with cal in every calendar
		set output to output & my clean(name of cal) & RS
	end repeat
end tell
return output
"#
    )
}

pub fn list_events_script(spec: &QuerySpec) -> String {
    let calendars = match &spec.calendar_filter {
        Some(name) => format!("(every calendar whose name is {})", quote(name)),
        None => "every calendar".to_owned(),
    };
    format!(
        r#"{HANDLERS}
set startDate to {start}
set endDate to {end}
set output to ""
tell application "Calendar"
	repeat with cal in {calendars}
		set calName to my clean(name of cal)
		set calEvents to (every event of cal whose start date >= startDate and start date <= endDate)
		repeat with ev in calEvents
			set evTitle to my clean(summary of ev)
			set evNotes to my clean(description of ev)
			set output to output & my stamp(start date of ev) & US & my stamp(end date of ev) & US & evTitle & US & calName & US & evNotes & RS
		end repeat
	end repeat
end tell
return output
"#,
        start = local_mkdate(&spec.start_bound),
        end = local_mkdate(&spec.end_bound),
    )
}

pub fn create_event_script(calendar: &str, event: &NewEvent) -> String {
    let notes = match &event.notes {
        Some(notes) => format!("\n\tset description of newEvent to {}", quote(notes)),
        None => String::new(),
    };
    format!(
        r#"{HANDLERS}
set startDate to {start}
set endDate to {end}
tell application "Calendar"
	set targetCal to first calendar whose name is {calendar}
	set newEvent to make new event at end of events of targetCal with properties {{summary:{title}, start date:startDate, end date:endDate}}{notes}
	save
end tell
return "created"
"#,
        start = local_mkdate(&event.start),
        end = local_mkdate(&event.end),
        calendar = quote(calendar),
        title = quote(&event.title),
    )
}

pub fn delete_events_script(title: &str, day: NaiveDate) -> String {
    let next = day.checked_add_days(Days::new(1)).unwrap_or(day);
    format!(
        r#"{HANDLERS}
set dayStart to {start}
set dayEnd to {end}
set deleted to 0
tell application "Calendar"
	considering case
		repeat with cal in every calendar
			set matches to (every event of cal whose summary is {title} and start date >= dayStart and start date < dayEnd)
			set matchCount to count of matches
			if matchCount > 0 then
				delete (every event of cal whose summary is {title} and start date >= dayStart and start date < dayEnd)
				set deleted to deleted + matchCount
			end if
		end repeat
	end considering
	save
end tell
return deleted as string
"#,
        start = midnight_mkdate(day),
        end = midnight_mkdate(next),
        title = quote(title),
    )
}

fn unexpected(what: &str, raw: &str) -> CalendarError {
    CalendarError::Backend(format!("Unexpected script output ({what}): {raw}"))
}

fn parse_stamp(raw: &str) -> CalendarResult<Timestamp> {
    NaiveDateTime::parse_from_str(raw, STAMP_FORMAT)
        .ok()
        .and_then(datetime::to_local)
        .ok_or_else(|| unexpected("timestamp", raw))
}

fn records(output: &str) -> impl Iterator<Item = &str> {
    output.split(RECORD_SEPARATOR).filter(|r| !r.is_empty())
}

pub fn parse_calendar_names(output: &str) -> Vec<String> {
    records(output).map(str::to_owned).collect()
}

pub fn parse_events(output: &str) -> CalendarResult<Vec<Event>> {
    records(output)
        .map(|record| {
            let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
            let [start, end, title, calendar, notes] = fields[..] else {
                return Err(unexpected("event record", record));
            };
            Ok(Event {
                title: title.to_owned(),
                start: parse_stamp(start)?,
                end: parse_stamp(end)?,
                calendar_name: calendar.to_owned(),
                notes: (!notes.is_empty()).then(|| notes.to_owned()),
            })
        })
        .collect()
}

pub struct ScriptBackend {
    runner: Box<dyn ScriptRunner>,
    preferred_calendar: Option<String>,
}

impl ScriptBackend {
    pub fn new(runner: Box<dyn ScriptRunner>, preferred_calendar: Option<String>) -> Self {
        Self {
            runner,
            preferred_calendar,
        }
    }
}

#[async_trait]
impl CalendarBackend for ScriptBackend {
    fn kind(&self) -> &'static str {
        "script"
    }

    async fn list_events(&self, spec: &QuerySpec) -> CalendarResult<Vec<Event>> {
        let output = self.runner.run(&list_events_script(spec)).await?;
        let events = parse_events(&output)?;
        debug!(raw = events.len(), "Parsed script events");
        Ok(spec.refine(events))
    }

    async fn create_event(&self, event: &NewEvent) -> CalendarResult<String> {
        let names = parse_calendar_names(&self.runner.run(&calendar_names_script()).await?);
        // Calendar.app has no default calendar in its dictionary; the first one stands in.
        let calendar = resolve_calendar(
            &names,
            event.calendar.as_deref(),
            self.preferred_calendar.as_deref(),
            names.first().map(String::as_str),
        )?;

        let output = self.runner.run(&create_event_script(&calendar, event)).await?;
        if output != "created" {
            return Err(unexpected("create", &output));
        }
        Ok(calendar)
    }

    async fn delete_events(&self, title: &str, day: NaiveDate) -> CalendarResult<usize> {
        let output = self.runner.run(&delete_events_script(title, day)).await?;
        output
            .parse::<usize>()
            .map_err(|_| unexpected("delete count", &output))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use super::super::datetime::parse_date_time;
    use super::*;

    /// Replays canned outputs and records every script it was given.
    #[derive(Clone, Default)]
    pub struct RecordingRunner {
        outputs: Arc<Mutex<VecDeque<String>>>,
        scripts: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingRunner {
        pub fn replying(outputs: &[&str]) -> Self {
            let runner = Self::default();
            runner
                .outputs
                .lock()
                .unwrap()
                .extend(outputs.iter().map(|o| o.to_string()));
            runner
        }

        pub fn scripts(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScriptRunner for RecordingRunner {
        async fn run(&self, script: &str) -> CalendarResult<String> {
            self.scripts.lock().unwrap().push(script.to_owned());
            Ok(self.outputs.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    /// Splits AppleScript source into code outside string literals and the
    /// decoded literals themselves.
    fn split_literals(script: &str) -> (String, Vec<String>) {
        let mut code = String::new();
        let mut literals = Vec::new();
        let mut chars = script.chars();
        while let Some(c) = chars.next() {
            if c != '"' {
                code.push(c);
                continue;
            }
            code.push_str("\"\"");
            let mut literal = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => match chars.next() {
                        Some('n') => literal.push('\n'),
                        Some('r') => literal.push('\r'),
                        Some('t') => literal.push('\t'),
                        Some(other) => literal.push(other),
                        None => {}
                    },
                    c => literal.push(c),
                }
            }
            literals.push(literal);
        }
        (code, literals)
    }

    fn record(fields: [&str; 5]) -> String {
        let mut out = fields.join(&FIELD_SEPARATOR.to_string());
        out.push(RECORD_SEPARATOR);
        out
    }

    fn new_event(title: &str, calendar: Option<&str>) -> NewEvent {
        NewEvent {
            title: title.to_owned(),
            start: parse_date_time("2026-03-01 09:00").unwrap(),
            end: parse_date_time("2026-03-01 09:15").unwrap(),
            calendar: calendar.map(str::to_owned),
            notes: None,
        }
    }

    #[test]
    fn test_quote_escapes_special_characters() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("line\nbreak\tand\rmore"), "\"line\\nbreak\\tand\\rmore\"");
        assert_eq!(quote("nul\0byte"), "\"nulbyte\"");
    }

    #[test]
    fn test_injected_title_stays_a_literal() {
        let hostile = "Lunch\" & (do shell script \"touch /tmp/pwned\") & \"\n¬ end tell";
        let benign_script = create_event_script("Home", &new_event("Lunch", None));
        let hostile_script = create_event_script("Home", &new_event(hostile, None));

        let (benign_code, _) = split_literals(&benign_script);
        let (hostile_code, literals) = split_literals(&hostile_script);
        assert_eq!(benign_code, hostile_code);
        assert!(literals.iter().any(|l| l == hostile));
        assert!(!hostile_code.contains("do shell script"));
        assert_eq!(benign_script.lines().count(), hostile_script.lines().count());
    }

    #[test]
    fn test_injected_delete_title_and_calendar_filter() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let hostile = "x\" or summary is not \"";
        let (code, literals) = split_literals(&delete_events_script(hostile, day));
        let (benign_code, _) = split_literals(&delete_events_script("x", day));
        assert_eq!(code, benign_code);
        assert_eq!(literals.iter().filter(|l| *l == hostile).count(), 2);

        let now = parse_date_time("2026-03-01 08:00").unwrap();
        let spec = QuerySpec::upcoming(now, 7, Some("Work\"; quit".into())).unwrap();
        let (code, literals) = split_literals(&list_events_script(&spec));
        assert!(!code.contains("quit"));
        assert!(literals.iter().any(|l| l == "Work\"; quit"));
    }

    #[test]
    fn test_dates_are_passed_as_components() {
        let event = new_event("Standup", None);
        let script = create_event_script("Home", &event);
        assert!(script.contains("set startDate to my mkdate(2026, 3, 1, 9, 0, 0)"));
        assert!(script.contains("set endDate to my mkdate(2026, 3, 1, 9, 15, 0)"));
        assert!(!script.contains("date \""));

        let day = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let script = delete_events_script("Standup", day);
        assert!(script.contains("set dayStart to my mkdate(2026, 12, 31, 0, 0, 0)"));
        assert!(script.contains("set dayEnd to my mkdate(2027, 1, 1, 0, 0, 0)"));
        assert!(script.contains("considering case"));
    }

    #[test]
    fn test_notes_line_only_when_present() {
        let mut event = new_event("Standup", None);
        assert!(!create_event_script("Home", &event).contains("description"));
        event.notes = Some("Bring \"slides\"".into());
        assert!(create_event_script("Home", &event)
            .contains("set description of newEvent to \"Bring \\\"slides\\\"\""));
    }

    #[test]
    fn test_mutating_scripts_save_once() {
        let saves = |script: &str| script.lines().filter(|l| l.trim() == "save").count();
        let mut event = new_event("Standup", None);
        assert_eq!(saves(&create_event_script("Home", &event)), 1);
        event.notes = Some("agenda".into());
        let script = create_event_script("Home", &event);
        assert_eq!(saves(&script), 1);
        let notes_at = script.find("set description of newEvent").unwrap();
        assert!(script[notes_at..].lines().any(|l| l.trim() == "save"));

        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let script = delete_events_script("Standup", day);
        assert_eq!(saves(&script), 1);
        let loop_end = script.find("end considering").unwrap();
        assert!(script[loop_end..].lines().any(|l| l.trim() == "save"));

        let now = parse_date_time("2026-03-01 08:00").unwrap();
        let spec = QuerySpec::upcoming(now, 7, None).unwrap();
        assert_eq!(saves(&list_events_script(&spec)), 0);
    }

    #[test]
    fn test_listed_text_is_cleaned_of_separators() {
        let now = parse_date_time("2026-03-01 08:00").unwrap();
        let spec = QuerySpec::upcoming(now, 7, None).unwrap();
        let script = list_events_script(&spec);
        assert!(script.contains("on clean(s)"));
        for field in ["name of cal", "summary of ev", "description of ev"] {
            assert!(script.contains(&format!("my clean({field})")), "{field}");
        }
        assert!(calendar_names_script().contains("my clean(name of cal)"));
    }

    #[test]
    fn test_parse_events() {
        let output = format!(
            "{}{}",
            record(["2026-03-01 09:00:00", "2026-03-01 09:15:00", "Standup", "Work", ""]),
            record(["2026-03-02 10:00:00", "2026-03-02 11:00:00", "1:1 | sync", "Home", "agenda"]),
        );
        let events = parse_events(&output).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Standup");
        assert_eq!(events[0].notes, None);
        assert_eq!(events[1].title, "1:1 | sync");
        assert_eq!(events[1].notes.as_deref(), Some("agenda"));
        assert_eq!(datetime::format(&events[1].end), "2026-03-02 11:00");

        assert!(parse_events("").unwrap().is_empty());
        assert!(parse_events("garbage").is_err());
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts_client_side() {
        let output = format!(
            "{}{}{}",
            record(["2026-03-04 09:00:00", "2026-03-04 09:30:00", "Team sync", "Work", ""]),
            record(["2026-03-02 09:00:00", "2026-03-02 09:30:00", "Dentist", "Home", ""]),
            record(["2026-03-03 09:00:00", "2026-03-03 09:30:00", "SYNC prep", "Home", ""]),
        );
        let runner = RecordingRunner::replying(&[&output]);
        let backend = ScriptBackend::new(Box::new(runner.clone()), None);

        let now = parse_date_time("2026-03-01 08:00").unwrap();
        let spec = QuerySpec::search(now, 30, "sync".into()).unwrap();
        let titles: Vec<_> = backend
            .list_events(&spec)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["SYNC prep", "Team sync"]);
        assert!(!runner.scripts()[0].contains("\"sync\""));
    }

    #[tokio::test]
    async fn test_create_resolves_calendar_before_mutating() {
        let names = format!("Home{RECORD_SEPARATOR}Work{RECORD_SEPARATOR}");

        let runner = RecordingRunner::replying(&[&names, "created"]);
        let backend = ScriptBackend::new(Box::new(runner.clone()), None);
        let calendar = backend.create_event(&new_event("Standup", None)).await.unwrap();
        assert_eq!(calendar, "Home");
        assert!(runner.scripts()[1].contains("first calendar whose name is \"Home\""));

        let runner = RecordingRunner::replying(&[&names, "created"]);
        let backend = ScriptBackend::new(Box::new(runner.clone()), Some("Work".into()));
        assert_eq!(
            backend.create_event(&new_event("Standup", None)).await.unwrap(),
            "Work"
        );

        let runner = RecordingRunner::replying(&[&names]);
        let backend = ScriptBackend::new(Box::new(runner.clone()), None);
        let err = backend
            .create_event(&new_event("Standup", Some("Nonexistent")))
            .await
            .unwrap_err();
        assert!(matches!(err, CalendarError::CalendarNotFound(ref n) if n == "Nonexistent"));
        assert_eq!(runner.scripts().len(), 1);

        let runner = RecordingRunner::replying(&[""]);
        let backend = ScriptBackend::new(Box::new(runner), None);
        assert!(matches!(
            backend.create_event(&new_event("Standup", None)).await,
            Err(CalendarError::NoDefaultCalendar)
        ));
    }

    #[tokio::test]
    async fn test_delete_reports_count() {
        let runner = RecordingRunner::replying(&["2", "0"]);
        let backend = ScriptBackend::new(Box::new(runner), None);
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(backend.delete_events("Standup", day).await.unwrap(), 2);
        assert_eq!(backend.delete_events("Standup", day).await.unwrap(), 0);
    }
}
