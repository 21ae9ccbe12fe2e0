//! Badge fetch, store, and public lookup endpoints.
//!
//! - GET  /badges/{username}  - live fetch from the upstream, reshaped
//! - POST /badges/store       - encrypt and upsert a badge list
//! - GET  /badges/public      - decrypt and serve a stored badge list
//!
//! Stored records are keyed by lower-cased username so lookups are
//! case-insensitive; the fetch path passes the username through unchanged
//! because the upstream matches case-insensitively on its own.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::badges::Badge;
use crate::db::BadgeRecordDoc;
use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::types::BadgewayError;
use crate::upstream::BadgeQueryOutcome;

/// Handle GET /badges/{username}
pub async fn handle_badge_fetch(state: Arc<AppState>, raw_username: &str) -> Response<Full<Bytes>> {
    let username = match urlencoding::decode(raw_username) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid username encoding" }),
            );
        }
    };
    if username.trim().is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Username is required" }),
        );
    }

    match state.upstream.fetch_badges(&username).await {
        Ok(BadgeQueryOutcome::Found { badges, upcoming }) => {
            debug!(username = %username, count = badges.len(), "Serving fetched badges");
            json_response(
                StatusCode::OK,
                json!({
                    "username": username,
                    "badges": badges,
                    "upcomingBadges": upcoming,
                }),
            )
        }
        Ok(BadgeQueryOutcome::UserNotFound) => json_response(
            StatusCode::NOT_FOUND,
            json!({ "error": "User not found" }),
        ),
        Err(e) => {
            warn!(username = %username, error = %e, "Badge fetch failed");
            error_response(e)
        }
    }
}

#[derive(Deserialize)]
struct StoreRequest {
    username: Option<String>,
    badges: Option<Vec<Badge>>,
}

/// Handle POST /badges/store
pub async fn handle_badge_store(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Failed to read request body: {e}") }),
            );
        }
    };

    store_from_bytes(state, body).await
}

/// Validate and store a badge list from a raw request body.
///
/// Validation runs before any storage access: a malformed request is a 400
/// with no upsert attempted.
async fn store_from_bytes(state: Arc<AppState>, body: Bytes) -> Response<Full<Bytes>> {
    let request: StoreRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Invalid JSON: {e}") }),
            );
        }
    };

    let (username, badges) = match (request.username, request.badges) {
        (Some(username), Some(badges)) if !username.trim().is_empty() => (username, badges),
        _ => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Username and badges are required" }),
            );
        }
    };

    let store = match state.store.as_ref() {
        Some(store) => store,
        None => {
            return error_response(BadgewayError::Database("Badge storage unavailable".into()));
        }
    };

    let plaintext = match serde_json::to_string(&badges) {
        Ok(plaintext) => plaintext,
        Err(e) => return error_response(e.into()),
    };
    let encrypted = match state.cipher.encrypt(&plaintext) {
        Ok(encrypted) => encrypted,
        Err(e) => return error_response(e),
    };

    match store.upsert(&username.trim().to_lowercase(), &encrypted).await {
        Ok(()) => {
            info!(username = %username, count = badges.len(), "Badges stored");
            json_response(StatusCode::OK, json!({ "success": true }))
        }
        Err(e) => {
            warn!(username = %username, error = %e, "Badge store failed");
            error_response(e)
        }
    }
}

/// Handle GET /badges/public?username={username}
pub async fn handle_public_badges(
    state: Arc<AppState>,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let username = match query.and_then(|q| query_param(q, "username")) {
        Some(username) if !username.trim().is_empty() => username,
        _ => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Username parameter is required" }),
            );
        }
    };

    let store = match state.store.as_ref() {
        Some(store) => store,
        None => {
            return error_response(BadgewayError::Database("Badge storage unavailable".into()));
        }
    };

    let record = match store.find_by_username(&username.trim().to_lowercase()).await {
        Ok(record) => record,
        Err(e) => {
            warn!(username = %username, error = %e, "Public badge lookup failed");
            return error_response(e);
        }
    };

    public_record_response(&state, &username, record)
}

/// Build the public-read response for a looked-up record.
///
/// A missing record is a 404, never an empty list.
fn public_record_response(
    state: &AppState,
    username: &str,
    record: Option<BadgeRecordDoc>,
) -> Response<Full<Bytes>> {
    let record = match record {
        Some(record) => record,
        None => {
            return error_response(BadgewayError::NotFound(
                "No badge data found for this user".into(),
            ));
        }
    };

    let plaintext = match state.cipher.decrypt(&record.encrypted) {
        Ok(plaintext) => plaintext,
        Err(e) => {
            warn!(username = %username, error = %e, "Stored badge payload unreadable");
            return error_response(e);
        }
    };
    let badges: Vec<Badge> = match serde_json::from_str(&plaintext) {
        Ok(badges) => badges,
        Err(e) => {
            return error_response(BadgewayError::Crypto(format!(
                "Stored payload is not a badge list: {e}"
            )));
        }
    };

    json_response(
        StatusCode::OK,
        json!({
            "username": username,
            "badges": badges,
            "updatedAt": record.updated_at.to_chrono().to_rfc3339(),
        }),
    )
}

/// Extract a query string parameter, form-decoded (`+` is a space)
fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key {
            let v = v.replace('+', " ");
            urlencoding::decode(&v).ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::demo_badges;
    use crate::config::Args;
    use crate::crypto::BadgeCipher;
    use crate::upstream::UpstreamClient;
    use clap::Parser;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

    /// AppState with a cipher and no storage attached
    fn storeless_state() -> Arc<AppState> {
        let args = Args::parse_from(["badgeway", "--badge-encryption-key", TEST_KEY]);
        let cipher = BadgeCipher::new(TEST_KEY).unwrap();
        let upstream = UpstreamClient::new("http://localhost:9/graphql", 1000).unwrap();
        Arc::new(AppState::new(args, cipher, upstream))
    }

    #[test]
    fn test_stored_payload_roundtrips_to_identical_badges() {
        // Same serialize/encrypt path as the store endpoint, same
        // decrypt/parse path as the public endpoint
        let cipher = BadgeCipher::new(TEST_KEY).unwrap();
        let badges = demo_badges("alice");

        let plaintext = serde_json::to_string(&badges).unwrap();
        let encrypted = cipher.encrypt(&plaintext).unwrap();
        let decrypted = cipher.decrypt(&encrypted).unwrap();
        let back: Vec<Badge> = serde_json::from_str(&decrypted).unwrap();

        assert_eq!(back, badges);
    }

    #[tokio::test]
    async fn test_store_missing_username_is_400_before_storage() {
        let state = storeless_state();

        // Validation rejects first: with no storage attached, reaching the
        // upsert path would answer 503, so a 400 proves no upsert was tried
        let resp = store_from_bytes(state.clone(), Bytes::from(r#"{"badges": []}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = store_from_bytes(state.clone(), Bytes::from(r#"{"username": "alice"}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = store_from_bytes(state.clone(), Bytes::from("not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // A well-formed request does reach the storage check
        let resp = store_from_bytes(state, Bytes::from(r#"{"username": "alice", "badges": []}"#)).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_public_read_missing_username_is_400() {
        let state = storeless_state();

        let resp = handle_public_badges(state.clone(), None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = handle_public_badges(state, Some("other=1")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_public_read_never_stored_is_404_not_empty_list() {
        let state = storeless_state();
        let resp = public_record_response(&state, "nobody", None);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_public_read_decrypts_stored_record() {
        let state = storeless_state();
        let badges = demo_badges("alice");
        let encrypted = state
            .cipher
            .encrypt(&serde_json::to_string(&badges).unwrap())
            .unwrap();
        let record = BadgeRecordDoc {
            _id: None,
            username: "alice".into(),
            encrypted,
            updated_at: bson::DateTime::now(),
        };

        let resp = public_record_response(&state, "alice", Some(record));
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_query_param_extraction() {
        assert_eq!(
            query_param("username=alice&extra=1", "username").as_deref(),
            Some("alice")
        );
        assert_eq!(
            query_param("extra=1&username=bob", "username").as_deref(),
            Some("bob")
        );
        assert_eq!(query_param("extra=1", "username"), None);
        assert_eq!(query_param("", "username"), None);
        // Percent- and form-decoded
        assert_eq!(
            query_param("username=alice%20dev", "username").as_deref(),
            Some("alice dev")
        );
        assert_eq!(
            query_param("username=alice+dev", "username").as_deref(),
            Some("alice dev")
        );
    }

    #[test]
    fn test_store_request_validation_shapes() {
        let missing_badges: StoreRequest =
            serde_json::from_str(r#"{"username": "alice"}"#).unwrap();
        assert!(missing_badges.badges.is_none());

        let missing_username: StoreRequest = serde_json::from_str(r#"{"badges": []}"#).unwrap();
        assert!(missing_username.username.is_none());

        let full: StoreRequest =
            serde_json::from_str(r#"{"username": "alice", "badges": []}"#).unwrap();
        assert_eq!(full.username.as_deref(), Some("alice"));
        assert_eq!(full.badges.unwrap().len(), 0);
    }
}
