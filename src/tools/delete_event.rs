use tracing::info;

use crate::calendar::datetime;
use crate::error::{CalendarError, CalendarResult};
use crate::mcp::ToolProvider;
use crate::tool_params;
use crate::tools::ToolContext;

#[derive(Default)]
pub struct DeleteEvent;

tool_params! {
    DeleteEventParams,
    required(title: string, "Exact title of the event to delete"),
    required(date: string, "Date of the event e.g. '2026-03-01'")
}

impl ToolProvider for DeleteEvent {
    const NAME: &'static str = "delete_event";
    const DESCRIPTION: &'static str = "Delete calendar events by exact title and date";
    type Params = DeleteEventParams;

    async fn execute_with_params(
        &self,
        ctx: &ToolContext<'_>,
        params: Self::Params,
    ) -> CalendarResult<String> {
        let day = datetime::parse_date(&params.date)
            .ok_or_else(|| CalendarError::parse("date", &params.date))?
            .date_naive();

        let deleted = ctx.backend.delete_events(&params.title, day).await?;
        info!(title = %params.title, deleted, "Events deleted");

        Ok(format!(
            "Deleted {deleted} event(s) titled '{}' on {}.",
            params.title,
            datetime::format_day(day)
        ))
    }
}
