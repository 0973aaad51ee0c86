use anyhow::Result;
use chrono::Local;
use serde_json::json;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::calendar::CalendarBackend;
use crate::config::Config;
use crate::mcp::{Request, Response};
use crate::tools::{self, ToolContext};

pub struct Server<'a> {
    backend: &'a dyn CalendarBackend,
    config: &'a Config,
}

impl<'a> Server<'a> {
    pub fn new(backend: &'a dyn CalendarBackend, config: &'a Config) -> Self {
        Self { backend, config }
    }

    pub async fn run(&self) -> Result<()> {
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Answers one line-delimited JSON-RPC request at a time until EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                break; // EOF
            }

            // Notifications carry no id and fail to parse; they need no answer.
            if let Ok(request) = serde_json::from_str::<Request>(&line) {
                let response = self.handle_request(request).await;
                let response_json = serde_json::to_string(&response)?;
                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    async fn handle_request(&self, request: Request) -> Response {
        let result = match request.method.as_str() {
            "initialize" => Self::handle_initialize(),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(&request).await,
            _ => json!({"error": "Method not found"}),
        };

        Response {
            jsonrpc: "2.0".to_owned(),
            id: request.id,
            result,
        }
    }

    fn handle_initialize() -> serde_json::Value {
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn handle_list_tools(&self) -> serde_json::Value {
        json!({
            "tools": tools::list_tools(self.config)
        })
    }

    async fn handle_call_tool(&self, request: &Request) -> serde_json::Value {
        let Some(params) = &request.params else {
            return json!({"error": "Missing parameters"});
        };
        let Some(name) = params.get("name").and_then(|n| n.as_str()) else {
            return json!({"error": "Missing tool name"});
        };
        let empty = json!({});
        let arguments = params.get("arguments").unwrap_or(&empty);

        let ctx = ToolContext {
            backend: self.backend,
            config: self.config,
            now: Local::now(),
        };

        match tools::execute_tool(&ctx, name, arguments).await {
            Ok(text) => json!({
                "content": [
                    {
                        "type": "text",
                        "text": text
                    }
                ]
            }),
            Err(e) => json!({"error": format!("Tool execution failed: {}", e)}),
        }
    }
}
