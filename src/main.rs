mod calendar;
mod config;
mod error;
mod gnome;
mod mcp;
mod tools;

use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use tracing_subscriber::EnvFilter;

use crate::calendar::native::{authorize, NativeBackend};
use crate::calendar::runner::Osascript;
use crate::calendar::script::ScriptBackend;
use crate::calendar::CalendarBackend;
use crate::config::{BackendKind, Config, CONFIG};
use crate::error::CalendarResult;
use crate::gnome::evolution::EvolutionStore;
use crate::tools::ToolContext;

const USAGE: &str = "Usage: calendar-mcp-server [<subcommand> <json>]";

async fn build_backend(config: &Config) -> CalendarResult<Box<dyn CalendarBackend>> {
    let preferred = config.calendar.preferred_calendar.clone();
    match config.calendar.backend {
        BackendKind::Native => {
            let access = authorize(EvolutionStore::connect().await?).await?;
            Ok(Box::new(NativeBackend::new(access, preferred)))
        }
        BackendKind::Script => Ok(Box::new(ScriptBackend::new(
            Box::new(Osascript::from_config(&config.script)),
            preferred,
        ))),
    }
}

enum Invocation {
    Serve,
    Once {
        subcommand: String,
        arguments: serde_json::Value,
    },
}

/// Checks the command line before any calendar is touched. `Err` holds the
/// message for stderr.
fn parse_invocation(args: &[String]) -> Result<Invocation, String> {
    match args {
        [] => Ok(Invocation::Serve),
        [subcommand, raw_arguments] => {
            match serde_json::from_str::<serde_json::Value>(raw_arguments) {
                Ok(arguments) if arguments.is_object() => Ok(Invocation::Once {
                    subcommand: subcommand.clone(),
                    arguments,
                }),
                _ => Err("ERROR: Invalid JSON".to_owned()),
            }
        }
        _ => Err(USAGE.to_owned()),
    }
}

/// Runs one tool. `Ok` is the text for stdout, `Err` the message for stderr.
async fn run_once(
    ctx: &ToolContext<'_>,
    subcommand: &str,
    arguments: &serde_json::Value,
) -> Result<String, String> {
    tools::execute_tool(ctx, subcommand, arguments)
        .await
        .map_err(|_| format!("ERROR: Unknown subcommand '{subcommand}'"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{message}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let helper_mode = matches!(invocation, Invocation::Once { .. });

    let config = &*CONFIG;
    let backend = match build_backend(config).await {
        Ok(backend) => backend,
        Err(err) => {
            tracing::error!("Calendar backend unavailable: {err}");
            // stdout belongs to the protocol in server mode
            if helper_mode {
                println!("{}", err.to_tool_text());
            }
            return Ok(ExitCode::FAILURE);
        }
    };
    tracing::info!(backend = backend.kind(), "Calendar backend ready");

    match invocation {
        Invocation::Once {
            subcommand,
            arguments,
        } => {
            let ctx = ToolContext {
                backend: backend.as_ref(),
                config,
                now: Local::now(),
            };
            match run_once(&ctx, &subcommand, &arguments).await {
                Ok(text) => {
                    println!("{text}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(message) => {
                    eprintln!("{message}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Invocation::Serve => {
            mcp::Server::new(backend.as_ref(), config).run().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
