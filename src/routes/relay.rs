//! GraphQL relay endpoint
//!
//! POST /graphql (also /leetcode/graphql) forwards the request body verbatim
//! to the upstream GraphQL API with browser-shaped headers and mirrors the
//! upstream status and body back. Bodies are not validated or rewritten;
//! the endpoint is an unauthenticated open relay to one fixed upstream
//! (see DESIGN.md for the accepted abuse surface).

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::routes::json_response;
use crate::server::AppState;
use crate::types::BadgewayError;

/// Handle POST /graphql
pub async fn handle_graphql_relay(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": format!("Failed to read request body: {e}") }),
            );
        }
    };

    match state.upstream.relay(body).await {
        Ok((status, bytes)) => Response::builder()
            .status(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(Full::new(bytes))
            .unwrap(),
        Err(BadgewayError::UpstreamUnreachable(message)) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": "Failed to fetch from LeetCode",
                "message": message,
            }),
        ),
        Err(e) => crate::routes::error_response(e),
    }
}
