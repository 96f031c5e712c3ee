//! HTTP transport for the agent server.
//!
//! `POST /rpc` carries JSON-RPC requests, `GET /health` reports liveness.

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::server::AgentServer;
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the HTTP router for an agent server.
pub fn create_router(server: Arc<AgentServer>) -> Router {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Handle POST requests to /rpc.
async fn handle_rpc(
    State(server): State<Arc<AgentServer>>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    Json(server.handle_request(request))
}

/// Handle health check requests.
async fn handle_health(State(server): State<Arc<AgentServer>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "agent": server.name(),
        "actions": server.registry().len(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
