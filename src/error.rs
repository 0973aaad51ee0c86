use thiserror::Error;

/// Failure of a single tool call.
///
/// Every variant renders to the text that follows `ERROR: ` in the tool
/// output; the transport never sees these as protocol failures.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("{0} required")]
    MissingField(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("Invalid {field}: {raw}")]
    Parse { field: &'static str, raw: String },

    #[error("Calendar '{0}' not found.")]
    CalendarNotFound(String),

    #[error("No default calendar.")]
    NoDefaultCalendar,

    #[error("Calendar access not authorized.")]
    NotAuthorized,

    #[error("{0}")]
    Backend(String),
}

impl CalendarError {
    pub fn parse(field: &'static str, raw: &str) -> Self {
        Self::Parse {
            field,
            raw: raw.to_owned(),
        }
    }

    pub fn to_tool_text(&self) -> String {
        format!("ERROR: {self}")
    }
}

impl From<anyhow::Error> for CalendarError {
    fn from(err: anyhow::Error) -> Self {
        Self::Backend(format!("{err:#}"))
    }
}

impl From<zbus::Error> for CalendarError {
    fn from(err: zbus::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

pub type CalendarResult<T> = std::result::Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_text_prefix() {
        assert_eq!(
            CalendarError::MissingField("query").to_tool_text(),
            "ERROR: query required"
        );
        assert_eq!(
            CalendarError::parse("start", "tomorrow").to_tool_text(),
            "ERROR: Invalid start: tomorrow"
        );
        assert_eq!(
            CalendarError::CalendarNotFound("Work".into()).to_tool_text(),
            "ERROR: Calendar 'Work' not found."
        );
    }

    #[test]
    fn test_anyhow_maps_to_backend() {
        let err: CalendarError = anyhow::anyhow!("bus unavailable").into();
        assert!(matches!(err, CalendarError::Backend(ref msg) if msg == "bus unavailable"));
    }
}
