//! Semantic message types for conversation transcripts.
//!
//! A transcript stores semantic messages, not wire format. On every model request
//! call `to_request_messages()` to generate the OpenAI-compatible wire format.
//! Transcripts are append-only: insertion order is causal order.

use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolType, FunctionCall,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Arguments as a JSON value (always an object)
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

/// A single message in a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool-role messages: the call this result answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message carrying tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool result answering `tool_call_id`
    pub fn tool_result(tool_call_id: impl Into<String>, content: &Value) -> Self {
        Self {
            role: Role::Tool,
            content: render_tool_content(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Convert to the OpenAI wire format
    pub fn to_request(&self) -> Result<ChatCompletionRequestMessage, OpenAIError> {
        let msg = match self.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(self.content.clone())
                .build()?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(self.content.clone())
                .build()?
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !self.content.is_empty() {
                    builder.content(self.content.clone());
                }
                if !self.tool_calls.is_empty() {
                    let calls: Vec<ChatCompletionMessageToolCall> = self
                        .tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments_value().to_string(),
                            },
                        })
                        .collect();
                    builder.tool_calls(calls);
                }
                builder.build()?.into()
            }
            Role::Tool => {
                let content = if self.content.is_empty() {
                    "<Tool returned an empty string>".to_string()
                } else {
                    self.content.clone()
                };
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(self.tool_call_id.clone().unwrap_or_default())
                    .content(content)
                    .build()?
                    .into()
            }
        };
        Ok(msg)
    }
}

/// Render a tool output for the transcript: strings verbatim, everything else as JSON
pub fn render_tool_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered, append-only conversation history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Start a transcript with a single user message
    pub fn with_user(content: impl Into<String>) -> Self {
        Self::from_messages(vec![Message::user(content)])
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages appended at or after `index`
    pub fn since(&self, index: usize) -> &[Message] {
        &self.messages[index.min(self.messages.len())..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Ids of tool calls not answered by a tool result before the next assistant turn.
    pub fn unanswered_tool_calls(&self) -> Vec<String> {
        let mut open: Vec<String> = Vec::new();
        let mut dangling = Vec::new();

        for message in &self.messages {
            match message.role {
                Role::Assistant => {
                    dangling.append(&mut open);
                    open.extend(message.tool_calls.iter().map(|c| c.id.clone()));
                }
                Role::Tool => {
                    if let Some(id) = &message.tool_call_id {
                        open.retain(|open_id| open_id != id);
                    }
                }
                Role::System | Role::User => {}
            }
        }

        dangling.extend(open);
        dangling
    }

    /// Build request messages. The system prompt is supplied separately and never stored.
    pub fn to_request_messages(
        &self,
        system_prompt: Option<&str>,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);

        if let Some(prompt) = system_prompt {
            messages.push(Message::system(prompt).to_request()?);
        }

        for message in &self.messages {
            messages.push(message.to_request()?);
        }

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_conversation() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("Hello"));
        transcript.push(Message::assistant("Hi there!"));

        let messages = transcript
            .to_request_messages(Some("You are a helpful assistant."))
            .unwrap();
        assert_eq!(messages.len(), 3); // system, user, assistant
    }

    #[test]
    fn test_tool_use_conversation() {
        let mut transcript = Transcript::with_user("Which companies do we have?");
        transcript.push(Message::assistant_with_tools(
            "",
            vec![ToolCall::new("call_1", "get-companies-tool", json!({}))],
        ));
        transcript.push(Message::tool_result(
            "call_1",
            &json!({"companies": ["Acme"]}),
        ));

        let messages = transcript.to_request_messages(None).unwrap();
        // user, assistant (with tool_call), tool result
        assert_eq!(messages.len(), 3);
        assert!(transcript.unanswered_tool_calls().is_empty());
    }

    #[test]
    fn test_unanswered_tool_calls_detected() {
        let mut transcript = Transcript::with_user("hi");
        transcript.push(Message::assistant_with_tools(
            "",
            vec![
                ToolCall::new("a", "x", json!({})),
                ToolCall::new("b", "y", json!({})),
            ],
        ));
        transcript.push(Message::tool_result("a", &json!("ok")));
        transcript.push(Message::assistant("done"));

        assert_eq!(transcript.unanswered_tool_calls(), vec!["b".to_string()]);
    }

    #[test]
    fn test_tool_content_rendering() {
        assert_eq!(render_tool_content(&json!("plain")), "plain");
        assert_eq!(render_tool_content(&json!({"error": "boom"})), r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_non_object_arguments_become_empty() {
        let call = ToolCall::new("1", "t", json!("not an object"));
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_transcript_serializes_as_list() {
        let transcript = Transcript::with_user("hi");
        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(value, json!([{"role": "user", "content": "hi"}]));
    }
}
