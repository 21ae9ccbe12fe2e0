//! Configuration for Badgeway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// Badge encryption key length in bytes (256 bits)
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// Badgeway - HTTP gateway for LeetCode badge verification
#[derive(Parser, Debug, Clone)]
#[command(name = "badgeway")]
#[command(about = "HTTP gateway for LeetCode badge verification and publishing")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3001")]
    pub listen: SocketAddr,

    /// Upstream GraphQL endpoint for badge and profile queries
    #[arg(long, env = "UPSTREAM_GRAPHQL_URL", default_value = "https://leetcode.com/graphql")]
    pub upstream_graphql_url: String,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "leetcode_badges")]
    pub mongodb_db: String,

    /// Symmetric key for badge payload encryption at rest (exactly 32 bytes)
    #[arg(long, env = "BADGE_ENCRYPTION_KEY", hide_env_values = true)]
    pub badge_encryption_key: Option<String>,

    /// Enable development mode (MongoDB connection becomes optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "15000")]
    pub request_timeout_ms: u64,
}

impl Args {
    /// Get the encryption key, validated for presence and length
    pub fn encryption_key(&self) -> Result<&str, String> {
        match self.badge_encryption_key.as_deref() {
            None => Err("BADGE_ENCRYPTION_KEY is required".to_string()),
            Some(key) if key.len() != ENCRYPTION_KEY_LEN => Err(format!(
                "BADGE_ENCRYPTION_KEY must be {} bytes (got {})",
                ENCRYPTION_KEY_LEN,
                key.len()
            )),
            Some(key) => Ok(key),
        }
    }

    /// Validate configuration
    ///
    /// A missing or wrong-length encryption key is fatal in every mode:
    /// stored badge payloads would be unreadable otherwise.
    pub fn validate(&self) -> Result<(), String> {
        self.encryption_key()?;
        Ok(())
    }
}

/// Configuration for the client-side verification flow (badgeway-verify)
#[derive(clap::Args, Debug, Clone)]
pub struct ClientArgs {
    /// Badgeway server base URL; profile checks, badge fetches, and badge
    /// persistence all go through it
    #[arg(long, env = "BADGEWAY_URL", default_value = "http://localhost:3001")]
    pub server_url: String,

    /// Directory holding the persisted verification state
    #[arg(long, env = "BADGEWAY_STATE_DIR", default_value = ".badgeway")]
    pub state_dir: PathBuf,

    /// Timeout in milliseconds for the badge persistence call
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "8000")]
    pub store_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_key(key: Option<&str>) -> Args {
        Args::parse_from(match key {
            Some(k) => vec![
                "badgeway".to_string(),
                "--badge-encryption-key".to_string(),
                k.to_string(),
            ],
            None => vec!["badgeway".to_string()],
        })
    }

    #[test]
    fn missing_key_fails_validation() {
        let args = args_with_key(None);
        assert!(args.validate().is_err());
    }

    #[test]
    fn short_key_fails_validation() {
        let args = args_with_key(Some("too-short"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn exact_length_key_passes() {
        let args = args_with_key(Some("0123456789abcdef0123456789abcdef"));
        assert!(args.validate().is_ok());
    }
}
