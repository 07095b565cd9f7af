//! HTTP transport
//!
//! Thin axum layer over the resolution engine, one route per exposed
//! operation. Engine faults arrive here already shaped as structured
//! results; only malformed session requests answer with error statuses.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::engine::{NamespaceReport, Resolution, ResolutionEngine};
use crate::session::Interaction;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ResolutionEngine>,
    pub session_ttl_secs: u64,
    pub data_dir: String,
}

#[derive(Deserialize)]
struct ExecuteRequest {
    prompt: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct SessionRequest {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct SessionHistoryResponse {
    session_id: String,
    history: Vec<Interaction>,
    context: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RegistryInitRequest {
    namespaces: Vec<String>,
}

async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Json<Resolution> {
    info!("Received execute request: {:.50}...", request.prompt);
    let resolution = state
        .engine
        .resolve(&request.prompt, request.session_id)
        .await;
    Json(resolution)
}

async fn create_session(State(state): State<AppState>) -> Json<Value> {
    let session_id = state.engine.sessions().create().await;
    Json(json!({ "session_id": session_id }))
}

async fn session_history(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<SessionHistoryResponse>, (StatusCode, Json<Value>)> {
    let Some(session_id) = request.session_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Session ID is required" })),
        ));
    };

    let history = state.engine.sessions().get_history(&session_id).await;
    if history.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": format!("Session {} not found", session_id) })),
        ));
    }

    let context = state.engine.sessions().get_full_context(&session_id).await;
    Ok(Json(SessionHistoryResponse {
        session_id,
        history,
        context,
    }))
}

async fn initialize_registry(
    State(state): State<AppState>,
    Json(request): Json<RegistryInitRequest>,
) -> Json<HashMap<String, NamespaceReport>> {
    let mut results = HashMap::new();
    for namespace in request.namespaces {
        let report = state.engine.register(&namespace).await;
        results.insert(namespace, report);
    }
    Json(results)
}

async fn registry_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "active",
        "function_count": state.engine.index_size().await,
        "data_dir": state.data_dir,
    }))
}

async fn cleanup_sessions(State(state): State<AppState>) -> Json<Value> {
    let removed = state
        .engine
        .sessions()
        .sweep(std::time::Duration::from_secs(state.session_ttl_secs))
        .await;
    info!("Session sweep removed {removed} sessions");
    Json(json!({ "removed": removed }))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Automation Agency",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Resolves free-text requests to automation functions and executes them",
        "endpoints": {
            "execute": "/api/execute",
            "session": {
                "create": "/api/session/create",
                "history": "/api/session/history"
            },
            "registry": {
                "initialize": "/api/registry/initialize",
                "status": "/api/registry/status"
            },
            "cleanup": "/api/cleanup"
        }
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/execute", post(execute))
        .route("/api/session/create", post(create_session))
        .route("/api/session/history", post(session_history))
        .route("/api/registry/initialize", post(initialize_registry))
        .route("/api/registry/status", get(registry_status))
        .route("/api/cleanup", post(cleanup_sessions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}
