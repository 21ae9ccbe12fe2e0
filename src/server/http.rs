//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Routing is a flat
//! method/path match; an optional `/api` prefix is stripped first so the
//! same handlers serve `/badges/...` and `/api/badges/...`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::crypto::BadgeCipher;
use crate::db::{BadgeStore, MongoClient};
use crate::routes;
use crate::types::BadgewayError;
use crate::upstream::UpstreamClient;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Encrypted badge record store; None when running without MongoDB
    pub store: Option<BadgeStore>,
    pub cipher: BadgeCipher,
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Create AppState without storage (dev mode, fetch/relay only)
    pub fn new(args: Args, cipher: BadgeCipher, upstream: UpstreamClient) -> Self {
        Self {
            args,
            mongo: None,
            store: None,
            cipher,
            upstream,
        }
    }

    /// Create AppState with MongoDB-backed badge storage
    pub fn with_mongo(
        args: Args,
        cipher: BadgeCipher,
        upstream: UpstreamClient,
        mongo: MongoClient,
        store: BadgeStore,
    ) -> Self {
        Self {
            args,
            mongo: Some(mongo),
            store: Some(store),
            cipher,
            upstream,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), BadgewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Badgeway listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.store.is_none() {
        warn!("Running without badge storage - /badges/store and /badges/public will return 503");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Strip the optional `/api` prefix so both spellings of each route work
fn normalize_path(path: &str) -> &str {
    match path.strip_prefix("/api") {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let raw_path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let path = normalize_path(&raw_path).to_string();

    info!("[{}] {} {}", addr, method, raw_path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        // GraphQL relay to the upstream
        (Method::POST, "/graphql") | (Method::POST, "/leetcode/graphql") => {
            to_boxed(routes::handle_graphql_relay(state, req).await)
        }

        // Stored badge lookup; matched before the {username} fetch route
        (Method::GET, "/badges/public") => {
            to_boxed(routes::handle_public_badges(state, query.as_deref()).await)
        }

        // Encrypt-and-store a badge list
        (Method::POST, "/badges/store") => {
            to_boxed(routes::handle_badge_store(state, req).await)
        }

        // Live badge fetch for a username
        (Method::GET, p) if p.starts_with("/badges/") => {
            let username = p.strip_prefix("/badges/").unwrap_or("");
            if username.is_empty() || username.contains('/') {
                to_boxed(not_found_response(&path))
            } else {
                to_boxed(routes::handle_badge_fetch(state, username).await)
            }
        }

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_strips_api_prefix() {
        assert_eq!(normalize_path("/api/badges/alice"), "/badges/alice");
        assert_eq!(normalize_path("/api/health"), "/health");
        assert_eq!(normalize_path("/badges/alice"), "/badges/alice");
        assert_eq!(normalize_path("/api"), "/");
        // Not an /api prefix, just a path that starts with the letters
        assert_eq!(normalize_path("/apiary"), "/apiary");
    }
}
