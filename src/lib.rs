//! CRM Copilot - a multi-agent assistant over a HubSpot CRM
//!
//! This crate provides:
//! - A router that picks the agent for each query
//! - A tool-calling agent loop shared by every agent
//! - A CRM agent with persistent conversations
//! - A three-stage campaign analysis pipeline
//! - An HTTP server and a CLI/REPL front end

pub mod config;
pub mod copilot;
pub mod crm;
pub mod error;
pub mod message;
pub mod server;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod templates;

// Agent system
pub mod agent;
pub mod events;
pub mod provider;
pub mod tool;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use copilot::{Copilot, CopilotOptions, CopilotReply};
pub use crm::{CrmAdapter, HubspotClient};
pub use error::{AgentError, CrmError, ProviderError, StoreError};
pub use telemetry::Telemetry;

pub use agent::{AgentSpec, BaseAgent, Destination, RouteDecision};
pub use events::{AgentEvent, TurnCompleteReason, TurnResult};
pub use message::{Message, ToolCall, Transcript};
pub use provider::{ChatModel, ModelResponse, ProviderClient, ProviderConfig};
pub use session::{RequestMetadata, SessionManager};
pub use store::{ConversationStore, MemoryConversationStore, SqliteConversationStore};
pub use tool::{Tool, ToolRegistry};
