//! HTTP route handlers.
//!
//! Handlers build `Response<Full<Bytes>>`; the server boxes bodies and owns
//! the method/path dispatch. Every response carries a permissive CORS header
//! because the expected callers are browser profile pages on other origins.

pub mod badges;
pub mod health;
pub mod relay;

pub use badges::{handle_badge_fetch, handle_badge_store, handle_public_badges};
pub use health::health_check;
pub use relay::handle_graphql_relay;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use crate::types::BadgewayError;

/// JSON response with the shared header set
pub fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Map an error to its JSON error response
pub fn error_response(err: BadgewayError) -> Response<Full<Bytes>> {
    let (status, message) = err.into_status_code_and_body();
    json_response(status, serde_json::json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_maps_status() {
        let resp = error_response(BadgewayError::NotFound("User not found".into()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = error_response(BadgewayError::Database("down".into()));
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = error_response(BadgewayError::Upstream {
            status: 429,
            message: "rate limited".into(),
        });
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_json_response_headers() {
        let resp = json_response(StatusCode::OK, serde_json::json!({"ok": true}));
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
