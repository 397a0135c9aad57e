//! OpenAI-compatible provider client
//!
//! Non-streaming chat completions with tool support.

use super::{ChatModel, ModelRequest, ModelResponse, ProviderConfig};
use crate::error::ProviderError;
use crate::message::ToolCall;
use crate::tool::to_openai_tools;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestMessage, ChatCompletionTool,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

/// OpenAI-compatible client wrapper
#[derive(Clone)]
pub struct ProviderClient {
    config: ProviderConfig,
    client: Client<OpenAIConfig>,
}

impl ProviderClient {
    /// Create a new provider client from config
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = Self::get_api_key(&config)?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(&api_key)
            .with_api_base(&config.base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }

    /// Get API key from environment or the XDG auth.json
    fn get_api_key(config: &ProviderConfig) -> Result<String, ProviderError> {
        let _ = dotenvy::dotenv();

        if let Ok(key) = std::env::var(&config.api_key_env) {
            return Ok(key);
        }

        if let Some(key) = Self::get_key_from_auth_json(&config.name) {
            return Ok(key);
        }

        Err(ProviderError::MissingApiKey(config.api_key_env.clone()))
    }

    /// Try to read API key from ~/.local/share/crm-copilot/auth.json
    fn get_key_from_auth_json(provider_name: &str) -> Option<String> {
        let auth_path = dirs::data_dir()?.join("crm-copilot").join("auth.json");

        let content = std::fs::read_to_string(&auth_path).ok()?;
        let auth: serde_json::Value = serde_json::from_str(&content).ok()?;

        auth.get(provider_name.to_lowercase())?
            .get("key")?
            .as_str()
            .map(|s| s.to_string())
    }

    /// Get the provider config
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Send a non-streaming chat completion request with tools
    pub async fn chat_with_tools(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
        model: Option<&str>,
    ) -> Result<CreateChatCompletionResponse, ProviderError> {
        let model = model.unwrap_or(&self.config.default_model);

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(model).messages(messages);

        if !tools.is_empty() {
            request_builder.tools(tools);
        }
        if let Some(temperature) = self.config.temperature {
            request_builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            request_builder.max_tokens(max_tokens);
        }

        let request = request_builder
            .build()
            .map_err(|e| ProviderError::Build(e.to_string()))?;

        self.client
            .chat()
            .create(request)
            .await
            .map_err(|e| ProviderError::Api(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for ProviderClient {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ProviderError> {
        let messages = request
            .transcript
            .to_request_messages(request.system_prompt)?;
        let tools = to_openai_tools(request.tools);
        let model = request.model.unwrap_or(&self.config.default_model);

        let start = Instant::now();
        let response = self.chat_with_tools(messages, tools, Some(model)).await?;
        tracing::debug!(
            model = %model,
            duration_ms = start.elapsed().as_millis() as u64,
            "chat completion returned"
        );

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(parse_choice(choice.message.content, choice.message.tool_calls))
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}

/// Convert a completion choice into a `ModelResponse`.
///
/// Calls with an empty name are dropped; arguments that do not parse as a JSON
/// object become `{}`.
pub(crate) fn parse_choice(
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionMessageToolCall>>,
) -> ModelResponse {
    let content = content.unwrap_or_default();

    let calls: Vec<ToolCall> = tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter(|tc| !tc.function.name.is_empty())
        .map(|tc| {
            let args = serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
            let id = if tc.id.is_empty() {
                format!("call_{}", uuid::Uuid::new_v4().simple())
            } else {
                tc.id
            };
            ToolCall::new(id, tc.function.name, args)
        })
        .collect();

    if calls.is_empty() {
        ModelResponse::Text(content)
    } else {
        ModelResponse::ToolCalls { content, calls }
    }
}
