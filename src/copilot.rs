//! Request dispatcher
//!
//! Routes a query, then hands it to the CRM session, the campaign pipeline or
//! the engagement-only entry. The whole dispatch runs under one deadline.

use crate::agent::{
    get_builtin_agents, BaseAgent, BuiltinAgents, CampaignPipeline, Destination, RouteDecision,
    Router, DEFAULT_MAX_ROUNDS,
};
use crate::crm::CrmAdapter;
use crate::error::AgentError;
use crate::events::AgentEvent;
use crate::provider::ChatModel;
use crate::session::{routed_metadata, SessionManager};
use crate::store::ConversationStore;
use crate::templates::Templates;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const GOODBYE: &str = "Exiting conversation. Goodbye!";

/// Default per-request deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A dispatch result, tagged with how the HTTP layer should send it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopilotReply {
    /// CRM agent answer, sent as `{"response": ...}`
    Json(String),
    /// Pipeline output, sent as `text/plain`
    Text(String),
}

impl CopilotReply {
    pub fn text(&self) -> &str {
        match self {
            CopilotReply::Json(text) | CopilotReply::Text(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            CopilotReply::Json(text) | CopilotReply::Text(text) => text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CopilotOptions {
    pub max_rounds: usize,
    pub request_timeout: Duration,
    pub events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl Default for CopilotOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            events: None,
        }
    }
}

pub struct Copilot {
    router: Router,
    sessions: SessionManager,
    pipeline: CampaignPipeline,
    agents: BuiltinAgents,
    request_timeout: Duration,
}

impl Copilot {
    pub fn new(
        model: Arc<dyn ChatModel>,
        crm: Arc<dyn CrmAdapter>,
        store: Arc<dyn ConversationStore>,
        options: CopilotOptions,
    ) -> Result<Self, AgentError> {
        let mut agent = BaseAgent::new(model);
        if let Some(tx) = options.events {
            agent = agent.with_events(tx);
        }
        let agents = get_builtin_agents(crm.clone(), options.max_rounds);
        let templates = Arc::new(Templates::new()?);

        Ok(Self {
            router: Router::new(agent.clone(), agents.router.clone()),
            sessions: SessionManager::new(agent.clone(), agents.crm.clone(), store),
            pipeline: CampaignPipeline::new(agent, agents.clone(), crm, templates),
            agents,
            request_timeout: options.request_timeout,
        })
    }

    pub fn agents(&self) -> &BuiltinAgents {
        &self.agents
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Route and dispatch one query
    pub async fn handle(&self, query: &str, conversation_id: &str) -> Result<CopilotReply, AgentError> {
        self.with_deadline(|cancel| self.dispatch(query, conversation_id, cancel))
            .await
    }

    /// Routing decision only
    pub async fn route(&self, query: &str) -> Result<RouteDecision, AgentError> {
        self.with_deadline(|cancel| self.router.route(query, cancel))
            .await
    }

    /// Stateless analysis of caller-supplied campaign data
    pub async fn analyze(&self, query: &str, data: &Value) -> Result<String, AgentError> {
        self.with_deadline(|cancel| self.pipeline.analyze(query, data, cancel))
            .await
    }

    async fn dispatch(
        &self,
        query: &str,
        conversation_id: &str,
        cancel: CancellationToken,
    ) -> Result<CopilotReply, AgentError> {
        let decision = self.router.route(query, cancel.clone()).await?;
        let destination = decision.resolve();
        if decision.destination().is_none() {
            tracing::warn!(raw = %decision.raw, "unknown destination, using the CRM agent");
        }
        tracing::info!(%destination, conversation_id, "dispatching");

        match destination {
            Destination::HubspotAgent => {
                if is_exit(query) {
                    return Ok(CopilotReply::Json(GOODBYE.to_string()));
                }
                let reply = self
                    .sessions
                    .handle(conversation_id, query, routed_metadata(&decision), cancel)
                    .await?;
                Ok(CopilotReply::Json(reply.response))
            }
            // optimization needs an analysis to work from, so both start at the top
            Destination::AnalyzeCampaignPerformance | Destination::OptimizeLeadFunnel => {
                let report = self.pipeline.run(query, cancel).await?;
                Ok(CopilotReply::Text(report.response))
            }
            Destination::EngagementStrategy => {
                let report = self.pipeline.run_engagement_only(cancel).await?;
                Ok(CopilotReply::Text(report.response))
            }
        }
    }

    async fn with_deadline<T, F, Fut>(&self, f: F) -> Result<T, AgentError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let cancel = CancellationToken::new();
        match tokio::time::timeout(self.request_timeout, f(cancel.clone())).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                let timeout_ms = self.request_timeout.as_millis() as u64;
                tracing::error!(timeout_ms, "request deadline exceeded");
                Err(AgentError::Timeout(timeout_ms))
            }
        }
    }
}

fn is_exit(query: &str) -> bool {
    let q = query.trim();
    q.eq_ignore_ascii_case("quit") || q.eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NO_DATA_TO_ANALYZE;
    use crate::message::ToolCall;
    use crate::provider::ModelResponse;
    use crate::store::MemoryConversationStore;
    use crate::testing::{ScriptedModel, StalledModel, StaticCrm};
    use serde_json::json;

    fn copilot(crm: StaticCrm, responses: Vec<ModelResponse>) -> (Copilot, Arc<ScriptedModel>, Arc<MemoryConversationStore>) {
        let model = Arc::new(ScriptedModel::new(responses));
        let store = Arc::new(MemoryConversationStore::new());
        let copilot = Copilot::new(model.clone(), Arc::new(crm), store.clone(), CopilotOptions::default()).unwrap();
        (copilot, model, store)
    }

    fn route(destination: &str) -> ModelResponse {
        ModelResponse::tool_calls(vec![ToolCall::new("r", "route-to-agent", json!({ "query": destination }))])
    }

    #[tokio::test]
    async fn test_crm_destination_uses_session() {
        let (copilot, _, store) = copilot(
            StaticCrm::sample(),
            vec![route("hubspot_agent"), ModelResponse::text("Acme and Globex.")],
        );
        let reply = copilot.handle("list companies", "conv-1").await.unwrap();
        assert_eq!(reply, CopilotReply::Json("Acme and Globex.".into()));

        let record = store.load("conv-1").await.unwrap().unwrap();
        assert_eq!(record.metadata["destination"], "hubspot_agent");
    }

    #[tokio::test]
    async fn test_exit_skips_agent_and_store() {
        let (copilot, model, store) = copilot(StaticCrm::sample(), vec![route("hubspot_agent")]);
        let reply = copilot.handle("  Quit ", "conv-1").await.unwrap();
        assert_eq!(reply.text(), GOODBYE);
        assert_eq!(model.call_count(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_destination_falls_back_to_crm_agent() {
        let (copilot, _, _) = copilot(
            StaticCrm::sample(),
            vec![ModelResponse::text("I think hubspot"), ModelResponse::text("Here you go.")],
        );
        let reply = copilot.handle("deals for Acme", "conv-2").await.unwrap();
        assert_eq!(reply, CopilotReply::Json("Here you go.".into()));
    }

    #[tokio::test]
    async fn test_analysis_destination_returns_text() {
        let (copilot, model, _) = copilot(StaticCrm::default(), vec![route("analyze_campaign_performance")]);
        let reply = copilot.handle("analyze my campaigns", "conv-3").await.unwrap();
        assert_eq!(reply, CopilotReply::Text(NO_DATA_TO_ANALYZE.into()));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_optimize_destination_runs_full_pipeline() {
        let (copilot, model, _) = copilot(
            StaticCrm::sample(),
            vec![
                route("optimize_lead_funnel"),
                ModelResponse::text("ANALYSIS"),
                ModelResponse::text("done"),
            ],
        );
        let reply = copilot.handle("optimize my funnel", "conv-4").await.unwrap();
        assert_eq!(reply, CopilotReply::Text("ANALYSIS".into()));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_engagement_destination() {
        let (copilot, _, _) = copilot(
            StaticCrm::sample(),
            vec![route("engagement_strategy"), ModelResponse::text("TACTICS")],
        );
        let reply = copilot.handle("how to engage leads", "conv-5").await.unwrap();
        assert_eq!(reply, CopilotReply::Text("TACTICS".into()));
    }

    #[tokio::test]
    async fn test_deadline() {
        let options = CopilotOptions {
            request_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let copilot = Copilot::new(
            Arc::new(StalledModel),
            Arc::new(StaticCrm::sample()),
            Arc::new(MemoryConversationStore::new()),
            options,
        )
        .unwrap();
        let err = copilot.handle("hello", "conv-6").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
    }

    #[test]
    fn test_is_exit() {
        assert!(is_exit("EXIT"));
        assert!(is_exit(" quit\n"));
        assert!(!is_exit("quit now"));
    }
}
