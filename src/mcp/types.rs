use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CalendarResult;
use crate::tools::ToolContext;

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub result: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Typed view of a tool's argument bag.
pub trait ToolParams: Sized {
    fn input_schema() -> serde_json::Value;

    fn extract_params(arguments: &serde_json::Value) -> CalendarResult<Self>;
}

pub trait ToolProvider: Default {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    type Params: ToolParams;

    fn get_tool_definition() -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_owned(),
            description: Self::DESCRIPTION.to_owned(),
            input_schema: Self::Params::input_schema(),
        }
    }

    async fn execute_with_params(
        &self,
        ctx: &ToolContext<'_>,
        params: Self::Params,
    ) -> CalendarResult<String>;

    /// Runs the tool; failures come back as `ERROR: ...` text.
    async fn execute(&self, ctx: &ToolContext<'_>, arguments: &serde_json::Value) -> String {
        let outcome = match Self::Params::extract_params(arguments) {
            Ok(params) => self.execute_with_params(ctx, params).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(text) => text,
            Err(err) => {
                warn!(tool = Self::NAME, "{err}");
                err.to_tool_text()
            }
        }
    }
}
