macro_rules! register_providers {
    (
        tools: [ $($tool:path),* $(,)? ]
    ) => {
        pub fn list_tools(config: &crate::config::Config) -> Vec<crate::mcp::ToolDefinition> {
            let mut tools = Vec::new();
            $(
                if config.is_tool_enabled::<$tool>() {
                    tools.push(<$tool>::get_tool_definition());
                }
            )*
            tools
        }

        /// Dispatches one call; only unknown or disabled names are errors.
        pub async fn execute_tool(
            ctx: &crate::tools::ToolContext<'_>,
            name: &str,
            arguments: &serde_json::Value,
        ) -> anyhow::Result<String> {
            $(
                if <$tool>::NAME == name && ctx.config.is_tool_enabled::<$tool>() {
                    tracing::debug!(tool = name, %arguments, "Executing tool");
                    return Ok(<$tool>::default().execute(ctx, arguments).await);
                }
            )*
            Err(anyhow::anyhow!("Tool not found: {}", name))
        }
    };
}

pub(crate) use register_providers;
