use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::calendar::NewEvent;

const ICAL_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// VEVENT as stored by Evolution Data Server.
#[derive(Debug, Clone)]
pub struct IcalEvent {
    pub uid: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

pub fn ical_time(t: &DateTime<Utc>) -> String {
    t.format(ICAL_TIME_FORMAT).to_string()
}

/// Escapes a TEXT property value (RFC 5545 section 3.3.11).
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Serializes `event` as a VEVENT component ready for `CreateObjects`.
pub fn to_vevent(uid: &str, event: &NewEvent, stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VEVENT".to_owned(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{}", ical_time(&stamp)),
        format!("DTSTART:{}", ical_time(&event.start.with_timezone(&Utc))),
        format!("DTEND:{}", ical_time(&event.end.with_timezone(&Utc))),
        format!("SUMMARY:{}", escape_text(&event.title)),
    ];
    if let Some(notes) = &event.notes {
        lines.push(format!("DESCRIPTION:{}", escape_text(notes)));
    }
    lines.push("END:VEVENT".to_owned());

    let mut ical = lines.join("\r\n");
    ical.push_str("\r\n");
    ical
}

impl FromStr for IcalEvent {
    type Err = anyhow::Error;

    fn from_str(ical_data: &str) -> Result<Self, Self::Err> {
        let ical = calcard::icalendar::ICalendar::parse(ical_data)
            .map_err(|e| anyhow::anyhow!("Failed to parse iCalendar data: {:?}", e))?;

        let event_component = ical
            .components
            .iter()
            .find(|c| {
                matches!(
                    c.component_type,
                    calcard::icalendar::ICalendarComponentType::VEvent
                )
            })
            .ok_or_else(|| anyhow::anyhow!("No VEVENT component found in iCalendar data"))?;

        let text = |property: calcard::icalendar::ICalendarProperty| {
            event_component
                .property(&property)
                .and_then(|p| p.values.first())
                .and_then(|v| v.as_text())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };
        let time = |property: calcard::icalendar::ICalendarProperty| {
            event_component
                .property(&property)
                .and_then(|p| p.values.first())
                .and_then(|v| v.as_partial_date_time())
                .and_then(|d| d.to_date_time_with_tz(calcard::common::timezone::Tz::UTC))
                .map(|dt| dt.with_timezone(&Utc))
        };

        Ok(IcalEvent {
            uid: text(calcard::icalendar::ICalendarProperty::Uid).unwrap_or_default(),
            summary: text(calcard::icalendar::ICalendarProperty::Summary),
            description: text(calcard::icalendar::ICalendarProperty::Description),
            start_time: time(calcard::icalendar::ICalendarProperty::Dtstart),
            end_time: time(calcard::icalendar::ICalendarProperty::Dtend),
        })
    }
}
