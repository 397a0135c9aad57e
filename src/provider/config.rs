//! Provider configuration

use serde::{Deserialize, Serialize};

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name for the provider
    pub name: String,
    /// API base URL (e.g., "https://api.mistral.ai/v1")
    pub base_url: String,
    /// Environment variable name for the API key
    pub api_key_env: String,
    /// Default model to use
    pub default_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ProviderConfig {
    /// Create a Mistral provider config (the default)
    pub fn mistral() -> Self {
        Self::custom(
            "Mistral",
            "https://api.mistral.ai/v1",
            "MISTRAL_API_KEY",
            "mistral-large-latest",
        )
    }

    /// Create an OpenAI provider config
    pub fn openai() -> Self {
        Self::custom("OpenAI", "https://api.openai.com/v1", "OPENAI_API_KEY", "gpt-4o")
    }

    /// Create an OpenRouter provider config
    pub fn openrouter() -> Self {
        Self::custom(
            "OpenRouter",
            "https://openrouter.ai/api/v1",
            "OPENROUTER_API_KEY",
            "mistralai/mistral-large",
        )
    }

    /// Create a custom provider config (e.g., LM Studio, vLLM)
    pub fn custom(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
            default_model: default_model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Look up a preset by name (case-insensitive)
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mistral" => Some(Self::mistral()),
            "openai" => Some(Self::openai()),
            "openrouter" => Some(Self::openrouter()),
            _ => None,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::mistral()
    }
}
