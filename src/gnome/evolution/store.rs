use std::{collections::BTreeMap, str::FromStr};

use async_trait::async_trait;
use chrono::{Local, Utc};
use tracing::debug;

use super::event::{ical_time, to_vevent, IcalEvent};
use super::{
    default_calendar_uid, get_calendar_sources, open_calendar_source, pick_default_source,
    SourceInfo,
};
use crate::calendar::native::{AuthorizationStatus, EventStore, StoredEvent};
use crate::calendar::{Event, NewEvent, Timestamp};
use crate::error::{CalendarError, CalendarResult};

const CALENDAR_INTERFACE: &str = "org.gnome.evolution.dataserver.Calendar";

#[derive(Debug, Clone)]
pub struct EventHandle {
    source_uid: String,
    uid: String,
}

/// [`EventStore`] backed by Evolution Data Server on the session bus.
pub struct EvolutionStore {
    connection: zbus::Connection,
}

impl EvolutionStore {
    pub async fn connect() -> CalendarResult<Self> {
        let connection = zbus::Connection::session().await?;
        Ok(Self { connection })
    }

    async fn sources(&self) -> CalendarResult<Vec<SourceInfo>> {
        Ok(get_calendar_sources(&self.connection).await?)
    }

    async fn source_named(&self, name: &str) -> CalendarResult<SourceInfo> {
        self.sources()
            .await?
            .into_iter()
            .find(|s| s.display_name == name)
            .ok_or_else(|| CalendarError::CalendarNotFound(name.to_owned()))
    }

    async fn fetch_from_source(
        &self,
        source: &SourceInfo,
        start: Timestamp,
        end: Timestamp,
    ) -> anyhow::Result<Vec<StoredEvent<EventHandle>>> {
        let (calendar_path, bus_name) = open_calendar_source(&self.connection, &source.uid).await?;
        let proxy = zbus::Proxy::new(
            &self.connection,
            bus_name.as_str(),
            calendar_path.as_str(),
            CALENDAR_INTERFACE,
        )
        .await?;

        let sexp_query = format!(
            "(occur-in-time-range? (make-time \"{}\") (make-time \"{}\"))",
            ical_time(&start.with_timezone(&Utc)),
            ical_time(&end.with_timezone(&Utc))
        );

        let response = proxy.call_method("GetObjectList", &(sexp_query,)).await?;
        let ical_objects = response.body().deserialize::<Vec<String>>()?;

        let mut events = Vec::new();
        for ical_data in ical_objects {
            let Ok(ical) = IcalEvent::from_str(&ical_data) else {
                continue;
            };
            let Some(start) = ical.start_time else {
                continue;
            };
            events.push(StoredEvent {
                id: EventHandle {
                    source_uid: source.uid.clone(),
                    uid: ical.uid,
                },
                event: Event {
                    title: ical.summary.unwrap_or_default(),
                    start: start.with_timezone(&Local),
                    end: ical.end_time.unwrap_or(start).with_timezone(&Local),
                    calendar_name: source.display_name.clone(),
                    notes: ical.description,
                },
            });
        }

        Ok(events)
    }
}

#[async_trait]
impl EventStore for EvolutionStore {
    type EventId = EventHandle;

    async fn authorization_status(&self) -> CalendarResult<AuthorizationStatus> {
        // EDS has no per-application access control; reaching the registry is enough.
        self.sources().await?;
        Ok(AuthorizationStatus::FullAccess)
    }

    async fn request_access(&self) -> CalendarResult<bool> {
        Ok(true)
    }

    async fn calendars(&self) -> CalendarResult<Vec<String>> {
        let mut names: Vec<String> = self
            .sources()
            .await?
            .into_iter()
            .map(|s| s.display_name)
            .collect();
        // Sources are sorted by name, so duplicates are adjacent.
        names.dedup();
        Ok(names)
    }

    async fn default_calendar(&self) -> CalendarResult<Option<String>> {
        let sources = self.sources().await?;
        let configured = default_calendar_uid();
        let default = pick_default_source(&sources, configured.as_deref());
        Ok(default.map(|s| s.display_name.clone()))
    }

    /// Covers every source carrying `calendar` as its display name.
    async fn events(
        &self,
        calendar: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> CalendarResult<Vec<StoredEvent<EventHandle>>> {
        let mut all_events = Vec::new();

        for source in self.sources().await? {
            if source.display_name != calendar {
                continue;
            }
            all_events.extend(self.fetch_from_source(&source, start, end).await?);
        }

        Ok(all_events)
    }

    async fn save(&self, calendar: &str, event: &NewEvent) -> CalendarResult<()> {
        let source = self.source_named(calendar).await?;
        let (calendar_path, bus_name) = open_calendar_source(&self.connection, &source.uid).await?;
        let proxy = zbus::Proxy::new(
            &self.connection,
            bus_name.as_str(),
            calendar_path.as_str(),
            CALENDAR_INTERFACE,
        )
        .await?;

        let uid = uuid::Uuid::new_v4().to_string();
        let vevent = to_vevent(&uid, event, Utc::now());
        let response = proxy
            .call_method("CreateObjects", &(vec![vevent], 0u32))
            .await?;
        let uids = response.body().deserialize::<Vec<String>>()?;
        debug!(calendar, ?uids, "Created event");
        Ok(())
    }

    async fn remove(&self, ids: &[EventHandle]) -> CalendarResult<()> {
        let mut by_source: BTreeMap<&str, Vec<(String, String)>> = BTreeMap::new();
        for id in ids {
            by_source
                .entry(id.source_uid.as_str())
                .or_default()
                .push((id.uid.clone(), String::new()));
        }

        for (source_uid, uid_rids) in by_source {
            let (calendar_path, bus_name) =
                open_calendar_source(&self.connection, source_uid).await?;
            let proxy = zbus::Proxy::new(
                &self.connection,
                bus_name.as_str(),
                calendar_path.as_str(),
                CALENDAR_INTERFACE,
            )
            .await?;
            proxy
                .call_method("RemoveObjects", &(uid_rids, "all", 0u32))
                .await?;
        }

        Ok(())
    }
}
