//! Configuration for the CRM copilot
//!
//! Precedence, lowest first: built-in defaults, the YAML file, `.env`,
//! `CRM_COPILOT_*` environment variables, then command-line flags (applied by
//! the binary).

use crate::crm::DEFAULT_BASE_URL;
use crate::provider::ProviderConfig;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "crm-copilot.yaml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,
    pub crm: CrmConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub agent: AgentConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Preset name (mistral, openai, openrouter) or `custom`
    pub provider: String,

    /// Base URL override; required for `custom`
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Model name/ID; the preset's default when unset
    pub model: Option<String>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    pub base_url: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Round cap for every tool-looping agent
    pub max_rounds: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Directory for log files
    pub log_dir: PathBuf,

    /// Enable verbose logging
    pub verbose: bool,

    /// OTLP collector endpoint; no export when unset
    pub otel_endpoint: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "mistral".to_string(),
            base_url: None,
            api_key_env: None,
            model: None,
            temperature: None,
            max_tokens: Some(4096),
        }
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "HUBSPOT_API_KEY".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|d| d.join("crm-copilot"))
            .unwrap_or_else(|| PathBuf::from(".crm_copilot"))
            .join("conversations.db");
        Self {
            backend: StoreBackend::Sqlite,
            path,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: crate::agent::DEFAULT_MAX_ROUNDS,
            request_timeout_secs: 120,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(".crm_copilot_logs"),
            verbose: false,
            otel_endpoint: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `crm-copilot.yaml` if it exists,
    /// then apply `.env` and environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `CRM_COPILOT_MODEL`, `CRM_COPILOT_BASE_URL` and `CRM_COPILOT_PORT`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(model) = lookup("CRM_COPILOT_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(base_url) = lookup("CRM_COPILOT_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(port) = lookup("CRM_COPILOT_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("CRM_COPILOT_PORT is not a port number: {}", port))?;
        }
        Ok(())
    }

    /// Resolve the provider preset and apply the overrides of `llm`
    pub fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let mut provider = match ProviderConfig::preset(&self.llm.provider) {
            Some(preset) => preset,
            None => {
                let Some(base_url) = &self.llm.base_url else {
                    bail!(
                        "Provider '{}' is not a preset and no base_url is configured",
                        self.llm.provider
                    );
                };
                ProviderConfig::custom(
                    &self.llm.provider,
                    base_url,
                    self.llm.api_key_env.as_deref().unwrap_or("LLM_API_KEY"),
                    self.llm.model.as_deref().unwrap_or_default(),
                )
            }
        };

        if let Some(base_url) = &self.llm.base_url {
            provider.base_url = base_url.clone();
        }
        if let Some(env) = &self.llm.api_key_env {
            provider.api_key_env = env.clone();
        }
        if let Some(model) = &self.llm.model {
            provider.default_model = model.clone();
        }
        if provider.default_model.is_empty() {
            bail!("No model configured for provider '{}'", self.llm.provider);
        }
        provider.temperature = self.llm.temperature;
        provider.max_tokens = self.llm.max_tokens;
        Ok(provider)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.request_timeout_secs.max(1))
    }

    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Set verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.telemetry.verbose = verbose;
        self
    }

    /// Set log directory
    pub fn with_log_dir(mut self, log_dir: PathBuf) -> Self {
        self.telemetry.log_dir = log_dir;
        self
    }
}
