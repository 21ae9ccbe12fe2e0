//! Health check endpoint
//!
//! Liveness probe at /health and /healthz. Returns 200 whenever the process
//! is up; the database block reports whether the badge store is usable so
//! operators can tell a healthy gateway from one running without storage.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::json_response;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
    pub mode: &'static str,
    pub node_id: String,
    pub database: DatabaseHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
}

/// Handle GET /health and /healthz
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        built_at: env!("BUILD_TIMESTAMP"),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        database: DatabaseHealth {
            connected: state.store.is_some(),
        },
    };

    json_response(
        StatusCode::OK,
        serde_json::to_value(response).unwrap_or_else(|_| serde_json::json!({"status": "ok"})),
    )
}
