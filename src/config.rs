use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mcp::ToolProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The host calendar store, accessed in-process
    Native,
    /// Generated AppleScript run through an interpreter
    Script,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Script
        } else {
            Self::Native
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Calendar new events go to when the call names none
    #[serde(default)]
    pub preferred_calendar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Interpreter reading the script from stdin
    #[serde(default = "default_script_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Upper bound for one script run
    #[serde(default = "default_script_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_script_command() -> String {
    "osascript".to_owned()
}

fn default_script_timeout_ms() -> u64 {
    30_000
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            command: default_script_command(),
            args: Vec::new(),
            timeout_ms: default_script_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingEventsConfig {
    /// Days to look ahead when the call omits `days`
    #[serde(default = "default_upcoming_days")]
    pub days: u32,
}

fn default_upcoming_days() -> u32 {
    7
}

impl Default for UpcomingEventsConfig {
    fn default() -> Self {
        Self {
            days: default_upcoming_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEventsConfig {
    /// Days back and forward to search when the call omits `days`
    #[serde(default = "default_search_days")]
    pub days: u32,
}

fn default_search_days() -> u32 {
    30
}

impl Default for SearchEventsConfig {
    fn default() -> Self {
        Self {
            days: default_search_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateEventConfig {}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeleteEventConfig {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub get_upcoming_events: Option<UpcomingEventsConfig>,
    pub search_events: Option<SearchEventsConfig>,
    pub create_event: Option<CreateEventConfig>,
    pub delete_event: Option<DeleteEventConfig>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            get_upcoming_events: Some(UpcomingEventsConfig::default()),
            search_events: Some(SearchEventsConfig::default()),
            create_event: Some(CreateEventConfig::default()),
            delete_event: Some(DeleteEventConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| "Failed to parse config file as JSON")?;

        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        let mut config_paths = vec![PathBuf::from("./calendar-mcp-config.json")];

        config_paths.push(gio::glib::user_config_dir().join("calendar-mcp/config.json"));

        for system_config_dir in gio::glib::system_config_dirs() {
            config_paths.push(system_config_dir.join("calendar-mcp/config.json"));
        }

        for path in &config_paths {
            if path.exists() {
                tracing::info!(path = %path.display(), "Loading configuration");
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    pub fn is_tool_enabled<T: ToolProvider>(&self) -> bool {
        match T::NAME {
            crate::tools::upcoming_events::UpcomingEvents::NAME => {
                self.tools.get_upcoming_events.is_some()
            }
            crate::tools::search_events::SearchEvents::NAME => self.tools.search_events.is_some(),
            crate::tools::create_event::CreateEvent::NAME => self.tools.create_event.is_some(),
            crate::tools::delete_event::DeleteEvent::NAME => self.tools.delete_event.is_some(),
            _ => true, // Unknown tools are enabled by default
        }
    }

    pub fn get_upcoming_events_config(&self) -> UpcomingEventsConfig {
        self.tools.get_upcoming_events.clone().unwrap_or_default()
    }

    pub fn get_search_events_config(&self) -> SearchEventsConfig {
        self.tools.search_events.clone().unwrap_or_default()
    }
}

// Loaded once per process
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load_default().unwrap_or_else(|err| {
        tracing::warn!("Ignoring configuration: {err:#}");
        Config::default()
    })
});
