mod macros;
pub mod params;
mod server;
mod types;

pub(crate) use macros::register_providers;
pub use server::Server;
pub use types::{Request, Response, ToolDefinition, ToolParams, ToolProvider};
