//! Router - query classification on top of the execution loop
//!
//! The router runs its spec for a single round and then reads the first
//! assistant message it produced. The destination is taken from, in order:
//! the first tool call's name, the arguments of a `route-to-agent` call, a
//! `route-to-agent(<name>)` pattern in the text, and finally the trimmed text.

use crate::agent::{AgentSpec, BaseAgent};
use crate::error::AgentError;
use crate::message::{Message, Role, ToolCall, Transcript};
use crate::tools::ROUTE_TOOL;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tokio_util::sync::CancellationToken;

static ROUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"route-to-agent\(([^)]+)\)").expect("route pattern is a valid regex")
});

/// Agents a query can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    HubspotAgent,
    AnalyzeCampaignPerformance,
    OptimizeLeadFunnel,
    EngagementStrategy,
}

impl Destination {
    pub const ALL: [Destination; 4] = [
        Destination::HubspotAgent,
        Destination::AnalyzeCampaignPerformance,
        Destination::OptimizeLeadFunnel,
        Destination::EngagementStrategy,
    ];

    /// Exact match on the agent name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::HubspotAgent => "hubspot_agent",
            Destination::AnalyzeCampaignPerformance => "analyze_campaign_performance",
            Destination::OptimizeLeadFunnel => "optimize_lead_funnel",
            Destination::EngagementStrategy => "engagement_strategy",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the raw destination string came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    ToolCall,
    ToolArguments,
    TextPattern,
    Literal,
}

/// The router's answer before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    /// Destination as the model expressed it; not guaranteed to be known
    pub raw: String,
    pub source: RouteSource,
}

impl RouteDecision {
    pub fn destination(&self) -> Option<Destination> {
        Destination::parse(&self.raw)
    }

    /// Validated destination; unknown names fall back to the CRM agent
    pub fn resolve(&self) -> Destination {
        self.destination().unwrap_or(Destination::HubspotAgent)
    }
}

/// What the pipeline does after the analysis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchChoice {
    Optimize,
    Engage,
    Done,
}

impl BranchChoice {
    /// Anything that is not a follow-up stage ends the pipeline
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "optimize_lead_funnel" => BranchChoice::Optimize,
            "engagement_strategy" => BranchChoice::Engage,
            _ => BranchChoice::Done,
        }
    }

    fn is_stage(name: &str) -> bool {
        BranchChoice::parse(name) != BranchChoice::Done
    }
}

/// Classifies queries with the routing spec
#[derive(Clone)]
pub struct Router {
    agent: BaseAgent,
    spec: Arc<AgentSpec>,
}

impl Router {
    pub fn new(agent: BaseAgent, spec: Arc<AgentSpec>) -> Self {
        Self { agent, spec }
    }

    /// Pick a destination for `query`. Never executes CRM tools.
    pub async fn route(
        &self,
        query: &str,
        cancellation: CancellationToken,
    ) -> Result<RouteDecision, AgentError> {
        let first = self.first_reply(query, cancellation).await?;
        let decision = parse_route(&first);
        tracing::info!(
            destination = %decision.raw,
            source = ?decision.source,
            "routing decision"
        );
        Ok(decision)
    }

    /// Ask the router which stage follows the analysis
    pub async fn choose_branch(
        &self,
        prompt: &str,
        cancellation: CancellationToken,
    ) -> Result<BranchChoice, AgentError> {
        let first = self.first_reply(prompt, cancellation).await?;
        let choice = parse_branch(&first);
        tracing::info!(branch = ?choice, "pipeline branch decision");
        Ok(choice)
    }

    async fn first_reply(
        &self,
        content: &str,
        cancellation: CancellationToken,
    ) -> Result<Message, AgentError> {
        let mut transcript = Transcript::with_user(content);
        // the reason does not matter here: an unknown tool name is itself a routing answer
        let result = self
            .agent
            .execute_turn(&self.spec, &mut transcript, cancellation)
            .await?;
        tracing::debug!(reason = ?result.reason, rounds = result.rounds, "router turn complete");

        transcript
            .messages()
            .iter()
            .find(|m| m.role == Role::Assistant)
            .cloned()
            .ok_or_else(|| AgentError::InvalidTranscript("router produced no reply".into()))
    }
}

/// Read a routing decision from the router's first reply
pub fn parse_route(reply: &Message) -> RouteDecision {
    if let Some(call) = reply.tool_calls.first() {
        if Destination::parse(&call.name).is_some() {
            return RouteDecision {
                raw: call.name.clone(),
                source: RouteSource::ToolCall,
            };
        }
        if call.name == ROUTE_TOOL {
            if let Some(name) = destination_argument(call, |v| Destination::parse(v).is_some()) {
                return RouteDecision {
                    raw: name,
                    source: RouteSource::ToolArguments,
                };
            }
        }
    }

    if let Some(captured) = route_pattern(&reply.content) {
        return RouteDecision {
            raw: captured,
            source: RouteSource::TextPattern,
        };
    }

    RouteDecision {
        raw: reply.content.trim().to_string(),
        source: RouteSource::Literal,
    }
}

/// Read the branch choice from the router's reply to the follow-up prompt
pub fn parse_branch(reply: &Message) -> BranchChoice {
    if let Some(call) = reply.tool_calls.first() {
        if BranchChoice::is_stage(&call.name) {
            return BranchChoice::parse(&call.name);
        }
        if call.name == ROUTE_TOOL {
            if let Some(name) = destination_argument(call, BranchChoice::is_stage) {
                return BranchChoice::parse(&name);
            }
        }
    }

    if let Some(captured) = route_pattern(&reply.content) {
        return BranchChoice::parse(&captured);
    }

    let prefix = reply.content.split('(').next().unwrap_or_default();
    BranchChoice::parse(prefix)
}

fn route_pattern(text: &str) -> Option<String> {
    ROUTE_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// First of `agent`, `destination`, `query` that holds an accepted name
fn destination_argument(call: &ToolCall, accept: impl Fn(&str) -> bool) -> Option<String> {
    ["agent", "destination", "query"].into_iter().find_map(|key| {
        call.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| accept(v))
            .map(str::to_string)
    })
}
