//! In-memory [`EventStore`] used by the tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::datetime::parse_date_time;
use super::native::{AuthorizationStatus, EventStore, StoredEvent};
use super::{Event, NewEvent, Timestamp};
use crate::error::{CalendarError, CalendarResult};

#[derive(Default)]
struct State {
    next_id: u64,
    events: Vec<(u64, Event)>,
    commits: usize,
    access_requests: usize,
}

pub struct MemoryStore {
    calendars: Vec<String>,
    default_calendar: Option<String>,
    status: AuthorizationStatus,
    grant_on_request: bool,
    unreadable: Vec<String>,
    state: Mutex<State>,
}

impl MemoryStore {
    /// The first calendar doubles as the store default.
    pub fn new(calendars: &[&str]) -> Self {
        Self {
            calendars: calendars.iter().map(|c| c.to_string()).collect(),
            default_calendar: calendars.first().map(|c| c.to_string()),
            status: AuthorizationStatus::FullAccess,
            grant_on_request: true,
            unreadable: Vec::new(),
            state: Mutex::default(),
        }
    }

    pub fn with_authorization(mut self, status: AuthorizationStatus, grant: bool) -> Self {
        self.status = status;
        self.grant_on_request = grant;
        self
    }

    /// Makes reads of `calendar` fail.
    pub fn with_unreadable(mut self, calendar: &str) -> Self {
        self.unreadable.push(calendar.to_owned());
        self
    }

    pub fn without_default(mut self) -> Self {
        self.default_calendar = None;
        self
    }

    pub fn insert(&self, title: &str, start: &str, end: &str, calendar: &str) {
        self.push(Event {
            title: title.to_owned(),
            start: parse_date_time(start).unwrap(),
            end: parse_date_time(end).unwrap(),
            calendar_name: calendar.to_owned(),
            notes: None,
        });
    }

    fn push(&self, event: Event) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.events.push((id, event));
    }

    pub fn snapshot(&self) -> Vec<Event> {
        let state = self.state.lock().unwrap();
        state.events.iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn access_requests(&self) -> usize {
        self.state.lock().unwrap().access_requests
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    type EventId = u64;

    async fn authorization_status(&self) -> CalendarResult<AuthorizationStatus> {
        Ok(self.status)
    }

    async fn request_access(&self) -> CalendarResult<bool> {
        self.state.lock().unwrap().access_requests += 1;
        Ok(self.grant_on_request)
    }

    async fn calendars(&self) -> CalendarResult<Vec<String>> {
        Ok(self.calendars.clone())
    }

    async fn default_calendar(&self) -> CalendarResult<Option<String>> {
        Ok(self.default_calendar.clone())
    }

    async fn events(
        &self,
        calendar: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> CalendarResult<Vec<StoredEvent<u64>>> {
        if self.unreadable.iter().any(|c| c == calendar) {
            return Err(CalendarError::Backend(format!("Calendar '{calendar}' is unreadable")));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|(_, e)| e.calendar_name == calendar)
            .filter(|(_, e)| e.start <= end && e.end >= start)
            .map(|(id, e)| StoredEvent {
                id: *id,
                event: e.clone(),
            })
            .collect())
    }

    async fn save(&self, calendar: &str, event: &NewEvent) -> CalendarResult<()> {
        self.push(Event {
            title: event.title.clone(),
            start: event.start,
            end: event.end,
            calendar_name: calendar.to_owned(),
            notes: event.notes.clone(),
        });
        self.state.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn remove(&self, ids: &[u64]) -> CalendarResult<()> {
        let mut state = self.state.lock().unwrap();
        state.events.retain(|(id, _)| !ids.contains(id));
        state.commits += 1;
        Ok(())
    }
}
