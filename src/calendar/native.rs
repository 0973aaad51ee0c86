//! Backend that talks to an in-process calendar store API.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::{datetime, resolve_calendar, CalendarBackend, Event, NewEvent, QuerySpec, Timestamp};
use crate::error::{CalendarError, CalendarResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    FullAccess,
    Denied,
    Restricted,
    NotDetermined,
}

/// Event as held by a store, with the handle needed to remove it later.
#[derive(Debug, Clone)]
pub struct StoredEvent<Id> {
    pub id: Id,
    pub event: Event,
}

/// Primitive operations a native calendar store offers.
#[async_trait]
pub trait EventStore: Send + Sync {
    type EventId: Send + Sync + Clone;

    async fn authorization_status(&self) -> CalendarResult<AuthorizationStatus>;

    /// Blocks until the user answers the access prompt.
    async fn request_access(&self) -> CalendarResult<bool>;

    async fn calendars(&self) -> CalendarResult<Vec<String>>;

    async fn default_calendar(&self) -> CalendarResult<Option<String>>;

    /// Events of `calendar` overlapping `[start, end]`.
    async fn events(
        &self,
        calendar: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> CalendarResult<Vec<StoredEvent<Self::EventId>>>;

    async fn save(&self, calendar: &str, event: &NewEvent) -> CalendarResult<()>;

    /// Removes all `ids` and commits once.
    async fn remove(&self, ids: &[Self::EventId]) -> CalendarResult<()>;
}

/// Proof that store access was granted. Only [`authorize`] creates one.
pub struct Authorized<S> {
    store: S,
}

/// Checks, and if needed requests, access to the store.
pub async fn authorize<S: EventStore>(store: S) -> CalendarResult<Authorized<S>> {
    let granted = match store.authorization_status().await? {
        AuthorizationStatus::FullAccess => true,
        AuthorizationStatus::Denied | AuthorizationStatus::Restricted => false,
        AuthorizationStatus::NotDetermined => {
            info!("Requesting calendar access");
            store.request_access().await?
        }
    };

    if granted {
        Ok(Authorized { store })
    } else {
        Err(CalendarError::NotAuthorized)
    }
}

pub struct NativeBackend<S> {
    store: S,
    preferred_calendar: Option<String>,
}

impl<S: EventStore> NativeBackend<S> {
    pub fn new(access: Authorized<S>, preferred_calendar: Option<String>) -> Self {
        Self {
            store: access.store,
            preferred_calendar,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: EventStore> CalendarBackend for NativeBackend<S> {
    fn kind(&self) -> &'static str {
        "native"
    }

    async fn list_events(&self, spec: &QuerySpec) -> CalendarResult<Vec<Event>> {
        let mut calendars = self.store.calendars().await?;
        if let Some(name) = &spec.calendar_filter {
            calendars.retain(|c| c == name);
            if calendars.is_empty() {
                debug!(calendar = %name, "Calendar filter matched nothing");
                return Ok(Vec::new());
            }
        }

        let mut events = Vec::new();
        for calendar in &calendars {
            match self.store.events(calendar, spec.start_bound, spec.end_bound).await {
                Ok(stored) => events.extend(stored.into_iter().map(|s| s.event)),
                Err(err) => warn!(%calendar, "Skipping calendar: {err}"),
            }
        }

        Ok(spec.refine(events))
    }

    async fn create_event(&self, event: &NewEvent) -> CalendarResult<String> {
        let names = self.store.calendars().await?;
        let default = match event.calendar {
            Some(_) => None,
            None => self.store.default_calendar().await?,
        };
        let calendar = resolve_calendar(
            &names,
            event.calendar.as_deref(),
            self.preferred_calendar.as_deref(),
            default.as_deref(),
        )?;

        self.store.save(&calendar, event).await?;
        Ok(calendar)
    }

    async fn delete_events(&self, title: &str, day: NaiveDate) -> CalendarResult<usize> {
        let (start, end) = datetime::day_window(day)
            .ok_or_else(|| CalendarError::parse("date", &datetime::format_day(day)))?;

        // Any unreadable calendar fails the whole call.
        let mut ids: Vec<S::EventId> = Vec::new();
        for calendar in self.store.calendars().await? {
            let stored = self.store.events(&calendar, start, end).await?;
            ids.extend(
                stored
                    .into_iter()
                    .filter(|s| s.event.title == title && start <= s.event.start && s.event.start < end)
                    .map(|s| s.id),
            );
        }

        if !ids.is_empty() {
            self.store.remove(&ids).await?;
        }
        Ok(ids.len())
    }
}
