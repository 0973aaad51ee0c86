use super::{datetime, Event};

pub const NO_UPCOMING_EVENTS: &str = "No upcoming events found.";

pub fn no_events_matching(query: &str) -> String {
    format!("No events found matching '{query}'.")
}

/// `<start> | <end> | <title> [<calendar>]`, one line per event.
pub fn upcoming(events: &[Event]) -> String {
    if events.is_empty() {
        return NO_UPCOMING_EVENTS.to_owned();
    }
    events
        .iter()
        .map(|e| {
            format!(
                "{} | {} | {} [{}]",
                datetime::format(&e.start),
                datetime::format(&e.end),
                e.title,
                e.calendar_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<start> | <title> [<calendar>]`, one line per event.
pub fn search(events: &[Event], query: &str) -> String {
    if events.is_empty() {
        return no_events_matching(query);
    }
    events
        .iter()
        .map(|e| {
            format!(
                "{} | {} [{}]",
                datetime::format(&e.start),
                e.title,
                e.calendar_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
