use crate::tool::{Tool, ToolContext, ToolDefinition, ToolOutput};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

pub const ROUTE_TOOL: &str = "route-to-agent";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RouteArgs {
    /// The destination agent, or the query to route
    #[serde(default)]
    pub query: String,
}

/// The router's only tool. It echoes its input and ends the routing turn.
pub struct RouteToAgentTool;

#[async_trait]
impl Tool for RouteToAgentTool {
    fn name(&self) -> &str {
        ROUTE_TOOL
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<RouteArgs>(
            ROUTE_TOOL,
            "Route the user query to the right agent",
        )
    }

    fn returns_direct(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let query = match args.get("query") {
            Some(Value::String(q)) => q.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        ToolOutput::success(Value::String(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echoes_query() {
        let out = RouteToAgentTool
            .execute(json!({"query": "hubspot_agent"}), &ToolContext::default())
            .await;
        assert_eq!(out.content, json!("hubspot_agent"));
        assert!(RouteToAgentTool.returns_direct());
    }
}
