//! Badgeway - HTTP gateway for LeetCode badge verification

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use badgeway::{
    config::Args,
    crypto::BadgeCipher,
    db::MongoClient,
    server::{self, AppState},
    upstream::UpstreamClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("badgeway={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration. A bad encryption key is fatal in every mode:
    // records written under the wrong key would be unreadable later.
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Badgeway - LeetCode Badge Gateway");
    info!("  version {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_COMMIT_SHORT"));
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("Upstream: {}", args.upstream_graphql_url);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("======================================");

    let key = match args.encryption_key() {
        Ok(key) => key.to_string(),
        Err(e) => {
            error!("Encryption setup failed: {}", e);
            std::process::exit(1);
        }
    };
    let cipher = match BadgeCipher::new(&key) {
        Ok(cipher) => cipher,
        Err(e) => {
            error!("Encryption setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let upstream = UpstreamClient::new(&args.upstream_graphql_url, args.request_timeout_ms)
        .unwrap_or_else(|e| {
            error!("Upstream client setup failed: {}", e);
            std::process::exit(1);
        });

    // Connect to MongoDB (optional in dev mode)
    let state = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(mongo) => {
            let store = match mongo.badge_store().await {
                Ok(store) => store,
                Err(e) => {
                    error!("Badge store initialization failed: {}", e);
                    std::process::exit(1);
                }
            };
            info!("MongoDB connected successfully");
            AppState::with_mongo(args, cipher, upstream, mongo, store)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, continuing without): {}", e);
                AppState::new(args, cipher, upstream)
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    server::run(Arc::new(state)).await?;

    Ok(())
}
