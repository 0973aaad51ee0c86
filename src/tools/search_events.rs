use crate::calendar::{format, QuerySpec};
use crate::error::CalendarResult;
use crate::mcp::ToolProvider;
use crate::tool_params;
use crate::tools::{window_days, ToolContext};

#[derive(Default)]
pub struct SearchEvents;

tool_params! {
    SearchEventsParams,
    required(query: string, "Keyword to search for in event titles"),
    optional(days: i64, "Days back and forward to search (default: 30)")
}

impl ToolProvider for SearchEvents {
    const NAME: &'static str = "search_events";
    const DESCRIPTION: &'static str = "Search calendar events by keyword";
    type Params = SearchEventsParams;

    async fn execute_with_params(
        &self,
        ctx: &ToolContext<'_>,
        params: Self::Params,
    ) -> CalendarResult<String> {
        let config = ctx.config.get_search_events_config();
        let days = window_days(params.days.unwrap_or(config.days.into()))?;

        let spec = QuerySpec::search(ctx.now, days, params.query.clone())?;
        let events = ctx.backend.list_events(&spec).await?;

        Ok(format::search(&events, &params.query))
    }
}
