//! HTTP front door
//!
//! - `POST /api/crmAgent`: route and dispatch one query on a conversation
//! - `POST /api/campaign-analytics`: stateless analysis of supplied data
//! - `GET /health`

use crate::copilot::{Copilot, CopilotReply};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument;

/// Shared state of all handlers
#[derive(Clone)]
pub struct AppState {
    pub copilot: Arc<Copilot>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(copilot: Arc<Copilot>) -> Self {
        Self {
            copilot,
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CrmAgentRequest {
    pub user_query: String,
    /// Clients send strings or numbers; absent means a new conversation
    #[serde(default)]
    pub conversation_id: Option<Value>,
}

impl CrmAgentRequest {
    fn conversation_id(&self) -> String {
        match &self.conversation_id {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            None | Some(Value::Null) | Some(Value::String(_)) => uuid::Uuid::new_v4().to_string(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    agents: Vec<String>,
}

/// Build the router with all routes and layers
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/crmAgent", post(crm_agent))
        .route("/api/campaign-analytics", post(campaign_analytics))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until `shutdown` fires
pub async fn serve(copilot: Arc<Copilot>, addr: &str, shutdown: CancellationToken) -> anyhow::Result<()> {
    let router = build_router(AppState::new(copilot));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "CRM copilot server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("CRM copilot server stopped");
    Ok(())
}

/// 500 `{status: "Failed", "Error message": ...}`
fn failed(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "Failed", "Error message": message })),
    )
        .into_response()
}

#[instrument(skip(state, body), fields(conversation_id = tracing::field::Empty))]
async fn crm_agent(
    State(state): State<AppState>,
    body: Result<Json<CrmAgentRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::error!(error = %rejection.body_text(), "invalid request body");
            return failed(rejection.body_text());
        }
    };
    let conversation_id = body.conversation_id();
    tracing::Span::current().record("conversation_id", conversation_id.as_str());

    match state.copilot.handle(&body.user_query, &conversation_id).await {
        Ok(CopilotReply::Json(response)) => Json(json!({ "response": response })).into_response(),
        Ok(CopilotReply::Text(text)) => text.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "request failed");
            failed(e.to_string())
        }
    }
}

#[instrument(skip(state, body))]
async fn campaign_analytics(
    State(state): State<AppState>,
    body: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(body)) => state
            .copilot
            .analyze(&body.query, &body.data)
            .await
            .map_err(|e| e.to_string()),
        Err(rejection) => Err(rejection.body_text()),
    };

    match result {
        Ok(response) => Json(json!({ "response": response })).into_response(),
        Err(message) => {
            tracing::error!(error = %message, "analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        agents: state
            .copilot
            .agents()
            .all()
            .iter()
            .map(|spec| spec.name.clone())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copilot::CopilotOptions;
    use crate::message::ToolCall;
    use crate::provider::ModelResponse;
    use crate::store::{ConversationStore, MemoryConversationStore};
    use crate::testing::{ScriptedModel, StaticCrm};
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn app(responses: Vec<ModelResponse>) -> (Router, Arc<MemoryConversationStore>) {
        let store = Arc::new(MemoryConversationStore::new());
        let copilot = Copilot::new(
            Arc::new(ScriptedModel::new(responses)),
            Arc::new(StaticCrm::sample()),
            store.clone(),
            CopilotOptions::default(),
        )
        .unwrap();
        (build_router(AppState::new(Arc::new(copilot))), store)
    }

    fn route(destination: &str) -> ModelResponse {
        ModelResponse::tool_calls(vec![ToolCall::new("r", "route-to-agent", json!({ "query": destination }))])
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_crm_agent_json_response() {
        let (app, store) = app(vec![route("hubspot_agent"), ModelResponse::text("Acme and Globex.")]);
        let response = app
            .oneshot(post_json(
                "/api/crmAgent",
                json!({ "user_query": "list companies", "conversation_id": 42 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, json!({ "response": "Acme and Globex." }));
        assert!(store.load("42").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_conversation_id_starts_new_conversation() {
        let (app, store) = app(vec![route("hubspot_agent"), ModelResponse::text("Hi.")]);
        let response = app
            .oneshot(post_json("/api/crmAgent", json!({ "user_query": "hello" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_reply_is_plain_text() {
        let (app, _) = app(vec![
            route("analyze_campaign_performance"),
            ModelResponse::text("ANALYSIS"),
            ModelResponse::text("done"),
        ]);
        let response = app
            .oneshot(post_json(
                "/api/crmAgent",
                json!({ "user_query": "analyze my campaigns", "conversation_id": "c1" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body_text(response).await, "ANALYSIS");
    }

    #[tokio::test]
    async fn test_failure_returns_500() {
        // no scripted responses: the router's model call fails
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(post_json(
                "/api/crmAgent",
                json!({ "user_query": "hello", "conversation_id": "c1" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "Failed");
        assert!(body["Error message"].as_str().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn test_missing_user_query_is_a_structured_failure() {
        let (app, store) = app(vec![]);
        let response = app
            .oneshot(post_json("/api/crmAgent", json!({ "conversation_id": "c1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "Failed");
        assert!(body["Error message"].as_str().unwrap().contains("user_query"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_is_a_structured_failure() {
        let (app, _) = app(vec![]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/crmAgent")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("user_query=hello"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "Failed");
        assert!(body["Error message"].is_string());
    }

    #[tokio::test]
    async fn test_campaign_analytics_rejects_malformed_body() {
        let (app, _) = app(vec![]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/campaign-analytics")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_campaign_analytics() {
        let (app, _) = app(vec![ModelResponse::text("Spend is on track.")]);
        let response = app
            .oneshot(post_json(
                "/api/campaign-analytics",
                json!({ "query": "how is spend?", "data": { "campaigns": [] } }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, json!({ "response": "Spend is on track." }));
    }

    #[tokio::test]
    async fn test_campaign_analytics_failure() {
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(post_json("/api/campaign-analytics", json!({ "query": "q", "data": {} })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["agents"][0], "router");
    }

    #[test]
    fn test_conversation_id_forms() {
        let req = |id: Option<Value>| CrmAgentRequest {
            user_query: String::new(),
            conversation_id: id,
        };
        assert_eq!(req(Some(json!("abc"))).conversation_id(), "abc");
        assert_eq!(req(Some(json!(7))).conversation_id(), "7");
        assert_eq!(req(None).conversation_id().len(), 36);
        assert_eq!(req(Some(json!(""))).conversation_id().len(), 36);
    }
}
