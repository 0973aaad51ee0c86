pub mod event;
pub mod store;

use anyhow::Result;
use gio::{glib, prelude::*};

pub use store::EvolutionStore;

const SOURCES_BUS_NAME: &str = "org.gnome.evolution.dataserver.Sources5";
const DEFAULT_SOURCES_SCHEMA: &str = "org.gnome.Evolution.DefaultSources";
const DEFAULT_CALENDAR_KEY: &str = "calendar-uid";
/// Built-in "Personal" calendar every EDS installation carries.
const SYSTEM_CALENDAR_UID: &str = "system-calendar";

#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub uid: String,
    pub display_name: String,
}

/// Returns the source described by `data` when it is an enabled calendar.
fn parse_calendar_source(uid: String, data: &str) -> Option<SourceInfo> {
    let key_file = glib::KeyFile::new();
    key_file
        .load_from_data(data, glib::KeyFileFlags::NONE)
        .ok()?;

    let enabled = key_file.boolean("Data Source", "Enabled").unwrap_or(false);
    if !enabled || !key_file.has_group("Calendar") {
        return None;
    }

    let display_name = key_file
        .string("Data Source", "DisplayName")
        .unwrap_or_else(|_| "Unknown".into());

    Some(SourceInfo {
        uid,
        display_name: display_name.to_string(),
    })
}

/// Enabled calendar sources, ordered by display name.
pub async fn get_calendar_sources(connection: &zbus::Connection) -> Result<Vec<SourceInfo>> {
    let proxy = zbus::fdo::ObjectManagerProxy::builder(connection)
        .destination(SOURCES_BUS_NAME)?
        .path("/org/gnome/evolution/dataserver/SourceManager")?
        .build()
        .await?;
    let mut sources = Vec::new();

    let objects = proxy.get_managed_objects().await?;
    for (object_path, _) in objects {
        let proxy = zbus::Proxy::new(
            connection,
            SOURCES_BUS_NAME,
            object_path.clone(),
            "org.gnome.evolution.dataserver.Source",
        )
        .await?;
        let data = proxy.get_property::<String>("Data").await?;
        let uid = proxy.get_property::<String>("UID").await?;

        if let Some(source_info) = parse_calendar_source(uid, &data) {
            sources.push(source_info);
        }
    }

    sources.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(sources)
}

/// Returns `(object path, bus name)` of the opened calendar.
pub async fn open_calendar_source(
    connection: &zbus::Connection,
    source_uid: &str,
) -> Result<(String, String)> {
    let proxy = zbus::Proxy::new(
        connection,
        "org.gnome.evolution.dataserver.Calendar8",
        "/org/gnome/evolution/dataserver/CalendarFactory",
        "org.gnome.evolution.dataserver.CalendarFactory",
    )
    .await?;

    let response = proxy.call_method("OpenCalendar", &(source_uid,)).await?;
    let (calendar_path, bus_name) = response.body().deserialize::<(String, String)>()?;
    Ok((calendar_path, bus_name))
}

/// UID of the calendar the desktop uses for new events, if configured.
pub fn default_calendar_uid() -> Option<String> {
    let source = gio::SettingsSchemaSource::default()?;
    let schema = source.lookup(DEFAULT_SOURCES_SCHEMA, true)?;
    if !schema.has_key(DEFAULT_CALENDAR_KEY) {
        return None;
    }

    let settings = gio::Settings::new_full(&schema, None::<&gio::SettingsBackend>, None);
    let uid = settings.string(DEFAULT_CALENDAR_KEY);
    (!uid.is_empty()).then(|| uid.to_string())
}

/// The configured default when it is still an enabled calendar, else the
/// built-in one.
pub fn pick_default_source<'a>(
    sources: &'a [SourceInfo],
    configured_uid: Option<&str>,
) -> Option<&'a SourceInfo> {
    configured_uid
        .and_then(|uid| sources.iter().find(|s| s.uid == uid))
        .or_else(|| sources.iter().find(|s| s.uid == SYSTEM_CALENDAR_UID))
}
