//! BaseAgent - the generic tool-calling execution loop
//!
//! One turn runs:
//! 1. Call the model with the transcript and the spec's tools
//! 2. Execute tool calls in order, appending one result per call
//! 3. Repeat until: tool-free response, direct-return tool, unknown tool, or round cap
//!
//! The loop knows nothing about routing or pipelines. Those are built on top of it
//! in router.rs and pipeline.rs.

use crate::agent::{AgentSpec, Continuation};
use crate::error::AgentError;
use crate::events::{AgentEvent, ExecutedToolCall, TurnCompleteReason, TurnResult};
use crate::message::{render_tool_content, Message, ToolCall, Transcript};
use crate::provider::{ChatModel, ModelRequest};
use crate::tool::{ToolContext, ToolOutput};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs agent specs against transcripts with a shared model
#[derive(Clone)]
pub struct BaseAgent {
    model: Arc<dyn ChatModel>,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl BaseAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            events: None,
        }
    }

    /// Send events to `tx` while turns execute
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Execute a full turn
    ///
    /// Every message produced is appended to `transcript`. Each tool call is
    /// answered by exactly one tool result before the next model invocation,
    /// including calls that were never executed because the turn stopped early.
    pub async fn execute_turn(
        &self,
        spec: &AgentSpec,
        transcript: &mut Transcript,
        cancellation: CancellationToken,
    ) -> Result<TurnResult, AgentError> {
        let dangling = transcript.unanswered_tool_calls();
        if !dangling.is_empty() {
            return Err(AgentError::InvalidTranscript(format!(
                "unanswered tool calls: {}",
                dangling.join(", ")
            )));
        }

        let ctx = ToolContext::new(cancellation.clone());
        let definitions = spec.tools.definitions();
        let mut executed: Vec<ExecutedToolCall> = Vec::new();
        let mut last_text = String::new();

        self.emit(AgentEvent::TurnStart {
            agent: spec.name.clone(),
        });

        for round in 1..=spec.max_rounds {
            if cancellation.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let request = ModelRequest {
                system_prompt: Some(&spec.system_prompt),
                transcript: &*transcript,
                tools: &definitions,
                model: spec.model.as_deref(),
            };
            let response = self.model.invoke(request).await?;

            let calls = response.calls().to_vec();
            last_text = response.content().to_string();
            tracing::debug!(
                agent = %spec.name,
                round,
                tool_calls = calls.len(),
                "model responded"
            );
            self.emit(AgentEvent::ModelResponse {
                agent: spec.name.clone(),
                round,
                text: last_text.clone(),
                tool_calls: calls.len(),
            });
            transcript.push(response.into_message());

            if calls.is_empty() {
                return Ok(self.complete(spec, TurnCompleteReason::ToolFree, last_text, executed, round));
            }

            let mut last_output: Option<(String, String)> = None;

            for (index, call) in calls.iter().enumerate() {
                let Some(tool) = spec.tools.get(&call.name) else {
                    tracing::warn!(agent = %spec.name, tool = %call.name, "unknown tool requested");
                    let error = json!({ "error": format!("Unknown tool: {}", call.name) });
                    transcript.push(Message::tool_result(&call.id, &error));
                    answer_skipped(transcript, &calls[index + 1..], "unknown tool earlier in this round");
                    let reason = TurnCompleteReason::UnknownTool {
                        name: call.name.clone(),
                    };
                    return Ok(self.complete(spec, reason, String::new(), executed, round));
                };

                let record = self.run_tool(spec, call, tool.as_ref(), &ctx).await;
                transcript.push(Message::tool_result(&call.id, &record.output));
                let rendered = render_tool_content(&record.output);
                executed.push(record);

                if tool.returns_direct() {
                    answer_skipped(
                        transcript,
                        &calls[index + 1..],
                        &format!("{} returned directly", call.name),
                    );
                    let reason = TurnCompleteReason::DirectReturn {
                        tool: call.name.clone(),
                    };
                    return Ok(self.complete(spec, reason, rendered, executed, round));
                }

                last_output = Some((call.name.clone(), rendered));
            }

            if spec.continuation == Continuation::StopAfterToolRound {
                if let Some((tool, output)) = last_output {
                    let reason = TurnCompleteReason::DirectReturn { tool };
                    return Ok(self.complete(spec, reason, output, executed, round));
                }
            }
        }

        tracing::warn!(agent = %spec.name, max_rounds = spec.max_rounds, "round limit reached");
        Ok(self.complete(
            spec,
            TurnCompleteReason::RoundLimitExceeded,
            last_text,
            executed,
            spec.max_rounds,
        ))
    }

    async fn run_tool(
        &self,
        spec: &AgentSpec,
        call: &ToolCall,
        tool: &dyn crate::tool::Tool,
        ctx: &ToolContext,
    ) -> ExecutedToolCall {
        let arguments = call.arguments_value();
        self.emit(AgentEvent::ToolCallStart {
            agent: spec.name.clone(),
            call_id: call.id.clone(),
            tool: call.name.clone(),
            arguments: arguments.clone(),
        });

        let start = Instant::now();
        let ToolOutput { content, is_error } = tool.execute(arguments.clone(), ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if is_error {
            tracing::warn!(agent = %spec.name, tool = %call.name, duration_ms, "tool returned an error");
        } else {
            tracing::info!(agent = %spec.name, tool = %call.name, duration_ms, "tool executed");
        }

        self.emit(AgentEvent::ToolCallEnd {
            agent: spec.name.clone(),
            call_id: call.id.clone(),
            tool: call.name.clone(),
            output: content.clone(),
            is_error,
            duration_ms,
        });

        ExecutedToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
            output: content,
            is_error,
            duration_ms,
        }
    }

    fn complete(
        &self,
        spec: &AgentSpec,
        reason: TurnCompleteReason,
        output: String,
        tool_calls: Vec<ExecutedToolCall>,
        rounds: usize,
    ) -> TurnResult {
        tracing::info!(agent = %spec.name, rounds, reason = ?reason, "turn complete");
        self.emit(AgentEvent::TurnComplete {
            agent: spec.name.clone(),
            reason: reason.clone(),
        });
        TurnResult {
            agent: spec.name.clone(),
            output,
            reason,
            tool_calls,
            rounds,
            max_rounds: spec.max_rounds,
        }
    }
}

/// Answer calls that will not run so the transcript holds no dangling call
fn answer_skipped(transcript: &mut Transcript, calls: &[ToolCall], why: &str) {
    for call in calls {
        let content = json!({ "error": format!("not executed: {}", why) });
        transcript.push(Message::tool_result(&call.id, &content));
    }
}
