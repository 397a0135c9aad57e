//! Conversation session manager
//!
//! Each request is a load → append → execute → store cycle on one
//! conversation. Cycles on the same conversation id are serialized with an
//! async mutex per id; different ids run concurrently.

use crate::agent::{AgentSpec, BaseAgent, RouteDecision};
use crate::error::AgentError;
use crate::message::{Message, Transcript};
use crate::store::ConversationStore;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// Request metadata persisted next to the transcript
///
/// Values that cannot be represented as JSON are stored as their debug
/// rendering instead, one field at a time, so inserting never fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMetadata {
    fields: Map<String, Value>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize + Debug>(&mut self, key: impl Into<String>, value: &T) {
        let key = key.into();
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "metadata field stringified");
                Value::String(format!("{:?}", value))
            }
        };
        self.fields.insert(key, value);
    }

    pub fn with<T: Serialize + Debug>(mut self, key: impl Into<String>, value: &T) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

/// Result of one session request
#[derive(Debug, Clone)]
pub struct SessionReply {
    pub response: String,
    /// Messages this request appended, user message included
    pub appended: usize,
    pub transcript_len: usize,
}

pub struct SessionManager {
    agent: BaseAgent,
    spec: Arc<AgentSpec>,
    store: Arc<dyn ConversationStore>,
    locks: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

/// Dead entries are pruned once the lock map grows past this
const LOCK_PRUNE_THRESHOLD: usize = 128;

impl SessionManager {
    pub fn new(agent: BaseAgent, spec: Arc<AgentSpec>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            agent,
            spec,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Run the session agent on `conversation_id` with a new user message
    pub async fn handle(
        &self,
        conversation_id: &str,
        user_message: &str,
        metadata: RequestMetadata,
        cancellation: CancellationToken,
    ) -> Result<SessionReply, AgentError> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;
        self.run_cycle(conversation_id, user_message, metadata, cancellation)
            .await
    }

    async fn run_cycle(
        &self,
        conversation_id: &str,
        user_message: &str,
        metadata: RequestMetadata,
        cancellation: CancellationToken,
    ) -> Result<SessionReply, AgentError> {
        let mut transcript = self
            .store
            .load(conversation_id)
            .await?
            .map(|record| record.transcript)
            .unwrap_or_else(Transcript::new);
        let start_len = transcript.len();
        tracing::debug!(conversation_id, prior_messages = start_len, "conversation loaded");

        transcript.push(Message::user(user_message));
        let result = self
            .agent
            .execute_turn(&self.spec, &mut transcript, cancellation)
            .await?;
        let response = result.into_output()?;

        let metadata = metadata
            .with("agent", &self.spec.name)
            .with("updated_at", &Utc::now().to_rfc3339())
            .with("message_count", &transcript.len());
        self.store
            .save(conversation_id, &transcript, &metadata.into_map())
            .await?;

        let appended = transcript.len() - start_len;
        tracing::info!(conversation_id, appended, "conversation saved");
        Ok(SessionReply {
            response,
            appended,
            transcript_len: transcript.len(),
        })
    }

    /// Shared lock for `conversation_id`. The map only holds weak references,
    /// so a request dropped mid-cycle leaves nothing alive behind it.
    fn lock_for(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        if locks.len() > LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(conversation_id).and_then(Weak::upgrade) {
            return existing;
        }

        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(conversation_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// Metadata for a routed request
pub fn routed_metadata(decision: &RouteDecision) -> RequestMetadata {
    RequestMetadata::new()
        .with("route", decision)
        .with("destination", &decision.resolve())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::get_builtin_agents;
    use crate::provider::ModelResponse;
    use crate::store::MemoryConversationStore;
    use crate::agent::RouteSource;
    use crate::testing::{ScriptedModel, StalledModel, StaticCrm};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn manager(responses: Vec<ModelResponse>) -> (SessionManager, Arc<ScriptedModel>, Arc<MemoryConversationStore>) {
        let model = Arc::new(ScriptedModel::new(responses));
        let store = Arc::new(MemoryConversationStore::new());
        let agents = get_builtin_agents(Arc::new(StaticCrm::sample()), 25);
        let manager = SessionManager::new(BaseAgent::new(model.clone()), agents.crm, store.clone());
        (manager, model, store)
    }

    #[tokio::test]
    async fn test_sequential_requests_accumulate() {
        let (manager, model, store) = manager(vec![
            ModelResponse::text("You have 2 companies."),
            ModelResponse::text("Acme and Globex."),
        ]);

        let first = manager
            .handle("c1", "how many companies?", RequestMetadata::new(), CancellationToken::new())
            .await
            .unwrap();
        let second = manager
            .handle("c1", "which ones?", RequestMetadata::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(first.response, "You have 2 companies.");
        assert_eq!(second.response, "Acme and Globex.");
        assert_eq!(second.transcript_len, first.appended + second.appended);

        // the second request saw the first exchange
        assert_eq!(model.requests()[1].messages.len(), 3);
        let record = store.load("c1").await.unwrap().unwrap();
        assert_eq!(record.transcript.len(), 4);
        assert_eq!(record.metadata["agent"], "hubspot_agent");
    }

    #[tokio::test]
    async fn test_tool_rounds_are_persisted() {
        let (manager, _, store) = manager(vec![
            ModelResponse::tool_calls(vec![crate::message::ToolCall::new(
                "call_1",
                "get-companies-tool",
                json!({}),
            )]),
            ModelResponse::text("Acme and Globex."),
        ]);
        let reply = manager
            .handle("c2", "list companies", RequestMetadata::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.appended, 4);
        let record = store.load("c2").await.unwrap().unwrap();
        assert!(record.transcript.unanswered_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_saved() {
        let (manager, _, store) = manager(vec![]);
        let err = manager
            .handle("c3", "hello", RequestMetadata::new(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
        assert!(store.is_empty());
        assert_eq!(manager.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_same_conversation_is_serialized() {
        let (manager, model, store) = manager(vec![
            ModelResponse::text("first"),
            ModelResponse::text("second"),
        ]);
        let manager = Arc::new(manager);

        let a = {
            let m = manager.clone();
            tokio::spawn(async move {
                m.handle("c4", "one", RequestMetadata::new(), CancellationToken::new()).await
            })
        };
        let b = {
            let m = manager.clone();
            tokio::spawn(async move {
                m.handle("c4", "two", RequestMetadata::new(), CancellationToken::new()).await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let record = store.load("c4").await.unwrap().unwrap();
        assert_eq!(record.transcript.len(), 4);
        let mut seen: Vec<usize> = model.requests().iter().map(|r| r.messages.len()).collect();
        seen.sort();
        assert_eq!(seen, vec![1, 3]);
        assert_eq!(manager.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_requests_release_their_locks() {
        let agents = get_builtin_agents(Arc::new(StaticCrm::sample()), 25);
        let store = Arc::new(MemoryConversationStore::new());
        let manager = SessionManager::new(BaseAgent::new(Arc::new(StalledModel)), agents.crm, store.clone());

        for i in 0..(LOCK_PRUNE_THRESHOLD + 20) {
            let id = format!("conv-{}", i);
            let pending = manager.handle(&id, "hello", RequestMetadata::new(), CancellationToken::new());
            assert!(tokio::time::timeout(Duration::from_millis(5), pending).await.is_err());
        }

        assert_eq!(manager.tracked_locks(), 0);
        // dead entries are pruned instead of accumulating
        assert!(manager.locks.lock().len() <= LOCK_PRUNE_THRESHOLD + 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_metadata_stringifies_unrepresentable_values() {
        // non-string map keys cannot become JSON object keys
        let mut odd = BTreeMap::new();
        odd.insert((1, 2), "pair");

        let metadata = RequestMetadata::new()
            .with("destination", &"hubspot_agent")
            .with("odd", &odd);

        assert_eq!(metadata.get("destination"), Some(&json!("hubspot_agent")));
        assert_eq!(metadata.get("odd"), Some(&json!("{(1, 2): \"pair\"}")));
    }

    #[test]
    fn test_routed_metadata() {
        let decision = RouteDecision {
            raw: "I think hubspot".into(),
            source: RouteSource::Literal,
        };
        let metadata = routed_metadata(&decision);
        assert_eq!(metadata.get("destination"), Some(&json!("hubspot_agent")));
        assert_eq!(
            metadata.get("route"),
            Some(&json!({"raw": "I think hubspot", "source": "literal"}))
        );
    }
}
