use crate::calendar::{format, QuerySpec};
use crate::error::CalendarResult;
use crate::mcp::ToolProvider;
use crate::tool_params;
use crate::tools::{window_days, ToolContext};

#[derive(Default)]
pub struct UpcomingEvents;

tool_params! {
    UpcomingEventsParams,
    optional(days: i64, "Number of days ahead to look (default: 7)"),
    optional(calendar: string, "Calendar name to filter by (optional)")
}

impl ToolProvider for UpcomingEvents {
    const NAME: &'static str = "get_upcoming_events";
    const DESCRIPTION: &'static str = "Get upcoming calendar events";
    type Params = UpcomingEventsParams;

    async fn execute_with_params(
        &self,
        ctx: &ToolContext<'_>,
        params: Self::Params,
    ) -> CalendarResult<String> {
        let config = ctx.config.get_upcoming_events_config();
        let days = window_days(params.days.unwrap_or(config.days.into()))?;

        let spec = QuerySpec::upcoming(ctx.now, days, params.calendar)?;
        let events = ctx.backend.list_events(&spec).await?;

        Ok(format::upcoming(&events))
    }
}
