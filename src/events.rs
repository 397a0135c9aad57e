//! Agent event types
//!
//! Events are emitted by `BaseAgent` while a turn executes and consumed by
//! output adapters (the REPL prints them). The typed `TurnResult` is what
//! callers act on; events are informational.

use serde::Serialize;
use serde_json::Value;

/// Events emitted during agent execution
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Turn started (entering the execution loop)
    TurnStart { agent: String },
    /// Model produced a response for a round
    ModelResponse {
        agent: String,
        round: usize,
        text: String,
        tool_calls: usize,
    },
    /// Tool call started
    ToolCallStart {
        agent: String,
        call_id: String,
        tool: String,
        arguments: Value,
    },
    /// Tool call completed
    ToolCallEnd {
        agent: String,
        call_id: String,
        tool: String,
        output: Value,
        is_error: bool,
        duration_ms: u64,
    },
    /// Turn completed (exiting the execution loop)
    TurnComplete {
        agent: String,
        reason: TurnCompleteReason,
    },
}

/// Reason the turn completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TurnCompleteReason {
    /// Model responded without tool calls
    ToolFree,
    /// A direct-return tool ran, or the agent stops after one tool round
    DirectReturn { tool: String },
    /// Round cap reached
    RoundLimitExceeded,
    /// Model asked for a tool that is not registered
    UnknownTool { name: String },
}

/// A tool call that was executed
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub output: Value,
    pub is_error: bool,
    pub duration_ms: u64,
}

/// Result of a single turn (returned by BaseAgent.execute_turn)
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Agent that ran the turn
    pub agent: String,
    /// Final text: the tool-free content, or the direct-return tool output
    pub output: String,
    /// Why the turn ended
    pub reason: TurnCompleteReason,
    /// Tool calls that were executed, in order
    pub tool_calls: Vec<ExecutedToolCall>,
    /// Model rounds used
    pub rounds: usize,
    /// Round cap in force for this turn
    pub max_rounds: usize,
}

impl TurnResult {
    pub fn is_success(&self) -> bool {
        matches!(
            self.reason,
            TurnCompleteReason::ToolFree | TurnCompleteReason::DirectReturn { .. }
        )
    }

    /// Output of a successful turn; unknown tools and exhausted round caps become errors
    pub fn into_output(self) -> Result<String, crate::error::AgentError> {
        match self.reason {
            TurnCompleteReason::ToolFree | TurnCompleteReason::DirectReturn { .. } => {
                Ok(self.output)
            }
            TurnCompleteReason::UnknownTool { name } => Err(crate::error::AgentError::UnknownTool {
                agent: self.agent,
                tool: name,
            }),
            TurnCompleteReason::RoundLimitExceeded => {
                Err(crate::error::AgentError::RoundLimitExceeded {
                    agent: self.agent,
                    limit: self.max_rounds,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(reason: TurnCompleteReason) -> TurnResult {
        TurnResult {
            agent: "hubspot_agent".into(),
            output: "done".into(),
            reason,
            tool_calls: vec![],
            rounds: 1,
            max_rounds: 25,
        }
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let value = serde_json::to_value(TurnCompleteReason::RoundLimitExceeded).unwrap();
        assert_eq!(value, json!({"reason": "round_limit_exceeded"}));

        let value = serde_json::to_value(TurnCompleteReason::UnknownTool {
            name: "nope".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"reason": "unknown_tool", "name": "nope"}));
    }

    #[test]
    fn test_into_output() {
        assert_eq!(result(TurnCompleteReason::ToolFree).into_output().unwrap(), "done");

        let err = result(TurnCompleteReason::RoundLimitExceeded)
            .into_output()
            .unwrap_err();
        assert!(err.to_string().contains("round limit of 25"));
    }
}
