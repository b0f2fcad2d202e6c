//! Stat and admin HTTP endpoint
//!
//! Read-only snapshots under `/stat`, plus `/push` to deliver a unit to one
//! connection by routing id.

use super::Server;
use crate::protocol::Proto;
use crate::zone::{PushOutcome, RoutingId};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the admin router
pub fn create_router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/stat", get(stat))
        .route("/health", get(health_check))
        .route("/push", post(push))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct StatQuery {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct ConnectionStats {
    sessions: usize,
    timers: usize,
}

async fn stat(State(server): State<Arc<Server>>, Query(query): Query<StatQuery>) -> Response {
    match query.kind.as_str() {
        "server" => Json(server.stats().server()).into_response(),
        "zone" => Json(server.zones().stats()).into_response(),
        "message" => Json(server.stats().message()).into_response(),
        "routine" => Json(server.stats().routine()).into_response(),
        "connection" => Json(ConnectionStats {
            sessions: server.zones().session_count(),
            timers: server.round().scheduled_timers(),
        })
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct PushRequest {
    id: u64,
    #[serde(rename = "type")]
    op: i16,
    #[serde(default = "default_ver")]
    ver: i8,
    #[serde(default)]
    seq: i32,
    #[serde(default)]
    body: Option<Box<RawValue>>,
}

fn default_ver() -> i8 {
    1
}

#[derive(Debug, Serialize)]
struct PushResponse {
    result: PushOutcome,
}

async fn push(
    State(server): State<Arc<Server>>,
    Json(request): Json<PushRequest>,
) -> Json<PushResponse> {
    let proto = Proto {
        ver: request.ver,
        op: request.op,
        seq: request.seq,
        body: request
            .body
            .map(|raw| raw.get().as_bytes().to_vec())
            .unwrap_or_default(),
    };
    let id = RoutingId::from_raw(request.id);
    let result = server.zones().push_to(id, proto);
    tracing::debug!(id = %id, result = ?result, "admin push");
    Json(PushResponse { result })
}
