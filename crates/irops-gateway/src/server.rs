use crate::error::ApiError;
use crate::middleware::trace_requests;
use axum::{
    extract::{Path, Query, State},
    middleware as axum_mw,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use irops_core::{Disruption, JobId};
use irops_orchestrator::{CoordinationReport, Coordinator, WorkerInfo};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

/// Messages returned by the per-disruption history view.
const HISTORY_LIMIT: usize = 20;
const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_RECENT_LIMIT: usize = 100;

/// Shared application state.
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router over a ready coordinator.
    pub fn build(coordinator: Arc<Coordinator>) -> Router {
        let state = Arc::new(AppState { coordinator });

        Router::new()
            .route("/health", get(health_handler))
            .route("/api/coordinate/{id}", post(coordinate_handler))
            .route("/api/agent_status", get(agent_status_handler))
            .route("/api/reset_agents", post(reset_agents_handler))
            .route("/api/disruptions", get(disruptions_handler))
            .route("/api/communications/recent", get(recent_communications_handler))
            .route("/api/communications/{id}", get(communications_handler))
            .route("/api/agents/{name}/messages", post(agent_messages_handler))
            .layer(ServiceBuilder::new().layer(axum_mw::from_fn(trace_requests)))
            .with_state(state)
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "irops"}))
}

async fn coordinate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<CoordinationReport>, ApiError> {
    info!(disruption_id = id, "Coordination requested");
    let report = state.coordinator.run(id).await?;
    Ok(Json(report))
}

async fn agent_status_handler(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, WorkerInfo>> {
    Json(state.coordinator.agent_status().await)
}

async fn reset_agents_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.coordinator.reset_agents().await;
    Json(json!({
        "success": true,
        "message": "All agents have been reset successfully",
    }))
}

async fn disruptions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Disruption>>, ApiError> {
    let disruptions = state.coordinator.store().list_disruptions().await?;
    Ok(Json(disruptions))
}

/// Newest first, at most [`HISTORY_LIMIT`] messages.
async fn communications_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<Value>, ApiError> {
    let mut messages = state.coordinator.mailbox().history(id).await?;
    messages.reverse();
    messages.truncate(HISTORY_LIMIT);
    Ok(Json(json!({
        "success": true,
        "disruption_id": id,
        "communications": messages,
    })))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
}

async fn recent_communications_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT);
    let messages = state.coordinator.mailbox().recent(limit).await?;
    Ok(Json(json!({"success": true, "communications": messages})))
}

async fn agent_messages_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let processed = state.coordinator.process_agent_messages(&name).await?;
    Ok(Json(json!({
        "success": true,
        "worker": name,
        "processed": processed,
    })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use irops_agent::backends::canned::StaticRecommender;
    use irops_orchestrator::CoordinatorConfig;
    use irops_store::MemoryStore;
    use tower::ServiceExt;

    async fn app() -> Router {
        let coordinator = Coordinator::airline(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticRecommender::new("Hold departures.")),
            CoordinatorConfig::default(),
        )
        .await
        .unwrap();
        GatewayServer::build(Arc::new(coordinator))
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(app().await, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "irops");
    }

    #[tokio::test]
    async fn test_coordinate_missing_disruption_is_404() {
        let (status, body) = call(app().await, "POST", "/api/coordinate/77").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Disruption 77 not found");
    }

    #[tokio::test]
    async fn test_recent_static_route_wins_over_id() {
        let (status, body) = call(app().await, "GET", "/api/communications/recent").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["communications"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_worker_messages_is_404() {
        let (status, body) = call(app().await, "POST", "/api/agents/ghost/messages").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
