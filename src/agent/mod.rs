//! Agent system
//!
//! Layers, bottom up:
//! - `BaseAgent`: generic tool-calling loop, emits events
//! - `Router`: one-round classification on top of the loop
//! - `CampaignPipeline`: analysis, branch decision and follow-up stages
//!
//! Agent configuration:
//! - `AgentSpec`: prompt, tools and termination rule of one agent
//! - `BuiltinAgents`: the fixed set of specs the copilot runs

mod base;
mod builtins;
mod config;
mod pipeline;
mod router;

pub use base::*;
pub use builtins::*;
pub use config::*;
pub use pipeline::*;
pub use router::*;
