//! Model invocation interface
//!
//! Agents talk to the model only through `ChatModel`: an ordered transcript
//! and a declared tool set go in, text or tool calls come out.

use crate::error::ProviderError;
use crate::message::{Message, ToolCall, Transcript};
use crate::tool::ToolDefinition;
use async_trait::async_trait;

/// One model request
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// Prepended to the request, never stored in the transcript
    pub system_prompt: Option<&'a str>,
    pub transcript: &'a Transcript,
    pub tools: &'a [ToolDefinition],
    /// Per-agent model override
    pub model: Option<&'a str>,
}

/// What the model produced for one round
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Text(String),
    ToolCalls { content: String, calls: Vec<ToolCall> },
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        ModelResponse::Text(content.into())
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        ModelResponse::ToolCalls {
            content: String::new(),
            calls,
        }
    }

    /// Text content of the response, empty for a bare tool-call response
    pub fn content(&self) -> &str {
        match self {
            ModelResponse::Text(content) => content,
            ModelResponse::ToolCalls { content, .. } => content,
        }
    }

    pub fn calls(&self) -> &[ToolCall] {
        match self {
            ModelResponse::Text(_) => &[],
            ModelResponse::ToolCalls { calls, .. } => calls,
        }
    }

    /// Transcript message for this response
    pub fn into_message(self) -> Message {
        match self {
            ModelResponse::Text(content) => Message::assistant(content),
            ModelResponse::ToolCalls { content, calls } => {
                Message::assistant_with_tools(content, calls)
            }
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ProviderError>;

    /// Model used when the request carries no override
    fn default_model(&self) -> &str;
}
