//! Agent configuration types
//!
//! An `AgentSpec` is immutable once built and is shared through `Arc`; any
//! number of transcripts may run through one spec at the same time.

use crate::tool::{Tool, ToolRegistry};
use serde::{Deserialize, Serialize};

/// Default round cap for one turn
pub const DEFAULT_MAX_ROUNDS: usize = 25;

/// What the loop does after a round of tool calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Continuation {
    /// Loop back to the model until it answers without tool calls
    #[default]
    UntilToolFree,
    /// Stop after the first tool round; the last tool output is the result
    StopAfterToolRound,
}

/// Immutable description of one agent: prompt, tools and termination rule
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub tools: ToolRegistry,
    pub continuation: Continuation,
    pub max_rounds: usize,
    /// Model override; the provider default is used when unset
    pub model: Option<String>,
}

impl AgentSpec {
    /// Create a new agent spec with defaults
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            system_prompt: system_prompt.into(),
            tools: ToolRegistry::new(),
            continuation: Continuation::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            model: None,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builder: replace the tool registry
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Builder: register one more tool
    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Builder: set continuation
    pub fn with_continuation(mut self, continuation: Continuation) -> Self {
        self.continuation = continuation;
        self
    }

    /// Builder: set round cap (at least one round)
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Builder: set model override
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
