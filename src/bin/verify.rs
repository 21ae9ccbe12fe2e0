//! badgeway-verify - client-side verification flow
//!
//! Drives the token/check/refresh lifecycle against a badgeway server,
//! persisting state under a local directory so the flow survives restarts.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use badgeway::config::ClientArgs;
use badgeway::verification::{
    FileStateStore, HttpBadgeSink, ProxyBadgeFetcher, ProxyProfileChecker, VerificationFlow,
    VerificationStatus,
};

#[derive(Parser, Debug)]
#[command(name = "badgeway-verify")]
#[command(about = "Verify LeetCode account ownership and sync badges")]
struct Cli {
    #[command(flatten)]
    args: ClientArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a verification token for a username
    Token {
        /// LeetCode username to verify
        username: String,
    },
    /// Check the profile bio for the token and sync badges on success
    Check,
    /// Re-fetch badges for an already-verified profile
    Refresh,
    /// Clear all verification state
    Reset,
    /// Show the current verification state
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("badgeway={},warn", cli.args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = &cli.args;
    let store = Arc::new(FileStateStore::new(args.state_dir.clone())?);
    let checker = Arc::new(ProxyProfileChecker::new(
        &args.server_url,
        args.store_timeout_ms,
    )?);
    let fetcher = Arc::new(ProxyBadgeFetcher::new(
        &args.server_url,
        args.store_timeout_ms,
    )?);
    let sink = Arc::new(HttpBadgeSink::new(&args.server_url, args.store_timeout_ms)?);

    let mut flow = VerificationFlow::new(
        checker,
        fetcher,
        sink,
        store,
        Duration::from_millis(args.store_timeout_ms),
    )?;

    match cli.command {
        Command::Token { username } => {
            let grant = flow.generate_token(&username)?;
            println!("Verification token: {}", grant.token);
            println!("Expires: {}", grant.expires_at.to_rfc3339());
            println!();
            println!("Add this token to your LeetCode profile summary (bio),");
            println!("then run: badgeway-verify check");
        }
        Command::Check => {
            let outcome = flow.check_verification().await;
            println!("{}", outcome.message);
            for badge in &outcome.badges {
                println!("  - {} ({})", badge.name, badge.category);
            }
            if !outcome.success {
                error!("Verification did not complete");
                std::process::exit(1);
            }
        }
        Command::Refresh => {
            let outcome = flow.refresh_badges().await;
            println!("{}", outcome.message);
            for badge in &outcome.badges {
                println!("  - {} ({})", badge.name, badge.category);
            }
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Command::Reset => {
            flow.reset()?;
            println!("Verification state cleared.");
        }
        Command::Status => {
            let state = flow.state();
            let username = if state.username.is_empty() {
                "-"
            } else {
                state.username.as_str()
            };
            println!("Username: {}", username);
            println!("Status:   {:?}", state.status);
            if let Some(token) = &state.token {
                println!("Token:    {}", token);
            }
            if let Some(expires) = &state.token_expires_at {
                println!("Expires:  {}", expires.to_rfc3339());
            }
            if state.status == VerificationStatus::Verified {
                if let Some(at) = &state.verified_at {
                    println!("Verified: {}", at.to_rfc3339());
                }
                println!(
                    "Badges:   {} ({})",
                    state.earned_badges.len(),
                    state.badges_source.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(())
}
