//! Error types, one enum per layer.
//!
//! Tool failures are not errors here: they travel as `{"error": ...}` payloads
//! inside the transcript. These enums cover the failures that abort a request.

use thiserror::Error;

/// Failures talking to the language model
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} not found in environment or auth.json")]
    MissingApiKey(String),

    #[error("Failed to build request: {0}")]
    Build(String),

    #[error("API call failed: {0}")]
    Api(String),

    #[error("Model returned no choices")]
    EmptyResponse,
}

impl From<async_openai::error::OpenAIError> for ProviderError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        ProviderError::Build(err.to_string())
    }
}

/// Failures inside the CRM adapter. Always rendered to `{"error": ...}` before
/// reaching a transcript.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("HubSpot API key not found in environment variable {0}")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HubSpot API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from HubSpot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),
}

/// Failures of the conversation store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Failures that abort an agent run or a dispatch
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Agent '{agent}' called unknown tool: {tool}")]
    UnknownTool { agent: String, tool: String },

    #[error("Agent '{agent}' exceeded the round limit of {limit}")]
    RoundLimitExceeded { agent: String, limit: usize },

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Cancelled")]
    Cancelled,
}

impl From<handlebars::RenderError> for AgentError {
    fn from(err: handlebars::RenderError) -> Self {
        AgentError::Template(err.to_string())
    }
}
