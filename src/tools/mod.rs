pub mod create_event;
pub mod delete_event;
pub mod search_events;
pub mod upcoming_events;

use crate::calendar::{CalendarBackend, Timestamp};
use crate::config::Config;
use crate::error::{CalendarError, CalendarResult};
use crate::mcp::{register_providers, ToolProvider};

register_providers! {
    tools: [
        crate::tools::upcoming_events::UpcomingEvents,
        crate::tools::search_events::SearchEvents,
        crate::tools::create_event::CreateEvent,
        crate::tools::delete_event::DeleteEvent,
    ]
}

/// What one tool invocation runs against.
pub struct ToolContext<'a> {
    pub backend: &'a dyn CalendarBackend,
    pub config: &'a Config,
    pub now: Timestamp,
}

fn window_days(days: i64) -> CalendarResult<u64> {
    u64::try_from(days)
        .map_err(|_| CalendarError::Invalid("days must be a non-negative integer".to_owned()))
}
