use tracing::info;

use crate::calendar::{datetime, NewEvent};
use crate::error::{CalendarError, CalendarResult};
use crate::mcp::ToolProvider;
use crate::tool_params;
use crate::tools::ToolContext;

#[derive(Default)]
pub struct CreateEvent;

tool_params! {
    CreateEventParams,
    required(title: string, "Event title"),
    required(start: string, "Start datetime e.g. '2026-03-01 14:00'"),
    required(end_time: string, "End datetime e.g. '2026-03-01 15:00'"),
    optional(calendar: string, "Calendar name (optional)"),
    optional(notes: string, "Optional notes")
}

impl ToolProvider for CreateEvent {
    const NAME: &'static str = "create_event";
    const DESCRIPTION: &'static str = "Create a new calendar event";
    type Params = CreateEventParams;

    async fn execute_with_params(
        &self,
        ctx: &ToolContext<'_>,
        params: Self::Params,
    ) -> CalendarResult<String> {
        let start = datetime::parse_date_time(&params.start)
            .ok_or_else(|| CalendarError::parse("start", &params.start))?;
        let end = datetime::parse_date_time(&params.end_time)
            .ok_or_else(|| CalendarError::parse("end_time", &params.end_time))?;
        if end < start {
            return Err(CalendarError::Invalid(
                "end_time must not be before start".to_owned(),
            ));
        }

        let event = NewEvent {
            title: params.title,
            start,
            end,
            calendar: params.calendar,
            notes: params.notes,
        };
        let calendar = ctx.backend.create_event(&event).await?;
        info!(title = %event.title, %calendar, "Event created");

        Ok(format!("Event '{}' created successfully.", event.title))
    }
}
