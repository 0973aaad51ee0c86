pub mod datetime;
pub mod format;
#[cfg(test)]
pub mod memory;
pub mod native;
pub mod runner;
pub mod script;

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, NaiveDate};

use crate::error::{CalendarError, CalendarResult};

pub type Timestamp = DateTime<Local>;

/// Snapshot of one event as read from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub title: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub calendar_name: String,
    pub notes: Option<String>,
}

/// Fields of an event about to be created.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub calendar: Option<String>,
    pub notes: Option<String>,
}

/// Time bounds and filters for one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub start_bound: Timestamp,
    pub end_bound: Timestamp,
    pub calendar_filter: Option<String>,
    pub keyword_filter: Option<String>,
}

impl QuerySpec {
    /// `[now, now + days]`, optionally restricted to one calendar.
    pub fn upcoming(now: Timestamp, days: u64, calendar: Option<String>) -> CalendarResult<Self> {
        let end_bound = now
            .checked_add_days(Days::new(days))
            .ok_or_else(|| CalendarError::Invalid(format!("days out of range: {days}")))?;
        Ok(Self {
            start_bound: now,
            end_bound,
            calendar_filter: calendar,
            keyword_filter: None,
        })
    }

    /// `[now - days, now + days]` across all calendars, titles containing
    /// `query`.
    pub fn search(now: Timestamp, days: u64, query: String) -> CalendarResult<Self> {
        let out_of_range = || CalendarError::Invalid(format!("days out of range: {days}"));
        let start_bound = now.checked_sub_days(Days::new(days)).ok_or_else(out_of_range)?;
        let end_bound = now.checked_add_days(Days::new(days)).ok_or_else(out_of_range)?;
        Ok(Self {
            start_bound,
            end_bound,
            calendar_filter: None,
            keyword_filter: Some(query),
        })
    }

    pub fn contains_start(&self, start: &Timestamp) -> bool {
        self.start_bound <= *start && *start <= self.end_bound
    }

    pub fn matches(&self, event: &Event) -> bool {
        if !self.contains_start(&event.start) {
            return false;
        }
        if let Some(calendar) = &self.calendar_filter {
            if event.calendar_name != *calendar {
                return false;
            }
        }
        match &self.keyword_filter {
            Some(keyword) => title_contains(&event.title, keyword),
            None => true,
        }
    }

    /// Applies the filters and orders the result by start time.
    ///
    /// The sort is stable so events sharing a start keep the backend's
    /// enumeration order.
    pub fn refine(&self, events: Vec<Event>) -> Vec<Event> {
        let mut events: Vec<Event> = events.into_iter().filter(|e| self.matches(e)).collect();
        events.sort_by_key(|e| e.start);
        events
    }
}

fn title_contains(title: &str, keyword: &str) -> bool {
    title.to_lowercase().contains(&keyword.to_lowercase())
}

/// Picks the calendar a new event goes to.
///
/// An explicit name must exist. Otherwise the preferred calendar wins when
/// present, then the backend default.
pub fn resolve_calendar(
    names: &[String],
    explicit: Option<&str>,
    preferred: Option<&str>,
    default: Option<&str>,
) -> CalendarResult<String> {
    if let Some(name) = explicit {
        return names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| CalendarError::CalendarNotFound(name.to_owned()));
    }
    if let Some(name) = preferred.and_then(|p| names.iter().find(|n| n.as_str() == p)) {
        return Ok(name.clone());
    }
    default
        .map(str::to_owned)
        .ok_or(CalendarError::NoDefaultCalendar)
}

/// Capability surface shared by every calendar backend.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Events whose start falls inside the query window, filtered and sorted.
    async fn list_events(&self, spec: &QuerySpec) -> CalendarResult<Vec<Event>>;

    /// Creates the event; returns the name of the calendar it went to.
    async fn create_event(&self, event: &NewEvent) -> CalendarResult<String>;

    /// Deletes every event titled exactly `title` starting on `day`; returns
    /// how many were removed.
    async fn delete_events(&self, title: &str, day: NaiveDate) -> CalendarResult<usize>;
}
