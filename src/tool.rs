//! Tool system
//!
//! Tools implement the `Tool` trait and are registered with a `ToolRegistry`.
//! A registry is immutable once it is placed inside an `AgentSpec`.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Tool definition for the model (matches OpenAI format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Build a definition whose parameters come from a `schemars` schema
    pub fn from_schema<T: schemars::JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let schema = schemars::schema_for!(T);
        let mut parameters = serde_json::to_value(schema).unwrap_or_else(|_| empty_parameters());
        if let Value::Object(map) = &mut parameters {
            map.remove("$schema");
            map.remove("title");
        }
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Build a definition for a tool that takes no arguments
    pub fn without_arguments(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_parameters(),
        }
    }
}

fn empty_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: Value,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Error output in the normalized `{"error": ...}` shape
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: json!({ "error": message.into() }),
            is_error: true,
        }
    }

    /// Wrap an adapter payload; a top-level `error` key marks a failure
    pub fn from_payload(content: Value) -> Self {
        let is_error = content.get("error").is_some();
        Self { content, is_error }
    }
}

/// Context passed to tools during execution
#[derive(Clone, Default)]
pub struct ToolContext {
    pub cancellation: CancellationToken,
}

impl ToolContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used for dispatch)
    fn name(&self) -> &str;

    /// Get the tool definition for the model
    fn definition(&self) -> ToolDefinition;

    /// When true the tool's raw output is the final answer and no further
    /// model round runs.
    fn returns_direct(&self) -> bool {
        false
    }

    /// Execute the tool with given arguments
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolOutput;
}

/// Parse tool arguments, mapping failures to a normalized tool error
pub fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolOutput> {
    serde_json::from_value(args).map_err(|e| ToolOutput::error(format!("Invalid arguments: {}", e)))
}

/// Registry of available tools, in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register an already shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Builder-style registration
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool definitions (for the model)
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Convert to OpenAI ChatCompletionTool format
    pub fn to_openai_tools(&self) -> Vec<async_openai::types::ChatCompletionTool> {
        to_openai_tools(&self.definitions())
    }
}

/// Convert definitions to OpenAI ChatCompletionTool format
pub fn to_openai_tools(definitions: &[ToolDefinition]) -> Vec<async_openai::types::ChatCompletionTool> {
    definitions
        .iter()
        .map(|def| async_openai::types::ChatCompletionTool {
            r#type: async_openai::types::ChatCompletionToolType::Function,
            function: async_openai::types::FunctionObject {
                name: def.name.clone(),
                description: Some(def.description.clone()),
                parameters: Some(def.parameters.clone()),
                strict: None,
            },
        })
        .collect()
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
