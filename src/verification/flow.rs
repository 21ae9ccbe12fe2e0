//! Two-phase verification flow.
//!
//! Phase 1 checks that the issued token is present in the user's public bio.
//! Phase 2 fetches the authoritative badge list and hands it to the
//! persistence sink; a sink failure fails the whole operation even though
//! the earlier phases succeeded - there is no "verified but not stored"
//! state. A fixed timeout wraps the sink call and surfaces a distinguishable
//! failure when the storage backend is unreachable.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::badges::{Badge, BadgeSource, FetchedBadges};
use crate::types::{BadgewayError, Result};
use crate::verification::state::{
    issue_token, TokenGrant, VerificationState, VerificationStatus,
};
use crate::verification::store::StateStore;

/// Result of a phase-1 ownership check
#[derive(Debug, Clone)]
pub struct BioCheck {
    pub verified: bool,
    pub message: Option<String>,
}

/// Checks whether a token appears in a profile's public bio
#[async_trait]
pub trait ProfileChecker: Send + Sync {
    async fn check_bio(&self, username: &str, token: &str) -> Result<BioCheck>;
}

/// Retrieves the badge list for a username.
///
/// Implementations signal a nonexistent user with `BadgewayError::NotFound`;
/// a degraded upstream may be answered with a `BadgeSource::Fallback` set.
#[async_trait]
pub trait BadgeFetcher: Send + Sync {
    async fn fetch(&self, username: &str) -> Result<FetchedBadges>;
}

/// Durable destination for a fetched badge list
#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn store(&self, username: &str, badges: &[Badge]) -> Result<()>;
}

/// Outcome reported to the caller/UI; failures carry a human-readable message
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub success: bool,
    pub message: String,
    pub badges: Vec<Badge>,
}

impl VerifyOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            badges: Vec::new(),
        }
    }
}

/// Client-side verification state machine.
///
/// Holds the state by value; operations take `&mut self`, so a single flow
/// instance cannot interleave verifications. Two instances sharing a state
/// store race with last-write-wins semantics.
pub struct VerificationFlow {
    checker: Arc<dyn ProfileChecker>,
    fetcher: Arc<dyn BadgeFetcher>,
    sink: Arc<dyn BadgeSink>,
    store: Arc<dyn StateStore>,
    store_timeout: Duration,
    state: VerificationState,
}

impl VerificationFlow {
    /// Create a flow, loading any persisted state.
    ///
    /// An expired token in the loaded state is cleared; a prior Verified
    /// status survives.
    pub fn new(
        checker: Arc<dyn ProfileChecker>,
        fetcher: Arc<dyn BadgeFetcher>,
        sink: Arc<dyn BadgeSink>,
        store: Arc<dyn StateStore>,
        store_timeout: Duration,
    ) -> Result<Self> {
        let state = store
            .load()?
            .map(|s| s.normalize_loaded(Utc::now()))
            .unwrap_or_default();

        Ok(Self {
            checker,
            fetcher,
            sink,
            store,
            store_timeout,
            state,
        })
    }

    /// Current state snapshot
    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    /// Issue a fresh token for a username, overwriting any previous token.
    ///
    /// The username is trimmed and case-folded. State moves to Pending.
    pub fn generate_token(&mut self, username: &str) -> Result<TokenGrant> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(BadgewayError::BadRequest("Username is required".into()));
        }

        let grant = issue_token(Utc::now());
        self.state.username = username;
        self.state.token = Some(grant.token.clone());
        self.state.token_expires_at = Some(grant.expires_at);
        self.state.status = VerificationStatus::Pending;
        self.persist();

        info!(username = %self.state.username, expires_at = %grant.expires_at, "Verification token issued");
        Ok(grant)
    }

    /// Run the two-phase verify-and-sync sequence.
    ///
    /// Phase 2 never begins unless phase 1 reports the token was found.
    /// An empty badge list is a valid successful outcome.
    pub async fn check_verification(&mut self) -> VerifyOutcome {
        let username = self.state.username.clone();
        if username.is_empty() {
            return self.fail("No verification in progress. Generate a token first.");
        }
        let token = match self.state.token.clone() {
            Some(token) => token,
            None => return self.fail("No token generated. Generate a token first."),
        };
        if !self.state.token_is_valid(Utc::now()) {
            // Expired tokens are not proof of ownership, but a prior
            // Verified status is left intact by fail().
            return self.fail("Token expired. Generate a new token and update your bio.");
        }

        self.state.status = VerificationStatus::Verifying;
        self.persist();

        // Phase 1: ownership check
        debug!(username = %username, "Checking profile bio for token");
        let check = match self.checker.check_bio(&username, &token).await {
            Ok(check) => check,
            Err(e) => return self.fail(format!("Verification failed: {e}")),
        };
        if !check.verified {
            let message = check
                .message
                .unwrap_or_else(|| "Token not found in profile bio.".to_string());
            return self.fail(message);
        }

        // Phase 2: badge retrieval and persistence
        self.state.is_fetching_badges = true;
        self.persist();

        let fetched = match self.fetcher.fetch(&username).await {
            Ok(fetched) => fetched,
            Err(BadgewayError::NotFound(_)) => {
                return self.fail("User not found on LeetCode");
            }
            Err(e) => return self.fail(format!("Failed to fetch badges: {e}")),
        };

        match tokio::time::timeout(self.store_timeout, self.sink.store(&username, &fetched.badges))
            .await
        {
            Err(_elapsed) => {
                return self.fail(
                    "Badge storage timed out - the storage backend may be unreachable. Please try again.",
                );
            }
            Ok(Err(e)) => {
                return self.fail(format!("Failed to store badges: {e}"));
            }
            Ok(Ok(())) => {}
        }

        let badge_count = fetched.badges.len();
        self.state.status = VerificationStatus::Verified;
        self.state.verified_at = Some(Utc::now());
        self.state.earned_badges = fetched.badges.clone();
        self.state.badges_source = Some(fetched.source.tag().to_string());
        self.state.is_fetching_badges = false;
        self.persist();

        let source_note = match &fetched.source {
            BadgeSource::Real { .. } => String::new(),
            BadgeSource::Fallback { reason } => {
                format!(" (Demo data - upstream unavailable: {reason})")
            }
        };
        let plural = if badge_count == 1 { "" } else { "s" };
        info!(username = %username, badges = badge_count, source = fetched.source.tag(), "Profile verified");

        VerifyOutcome {
            success: true,
            message: format!("Profile verified! Found {badge_count} badge{plural}.{source_note}"),
            badges: fetched.badges,
        }
    }

    /// Re-fetch badges for an already-verified profile.
    ///
    /// No ownership check; the list and its source tag are replaced
    /// wholesale. Fails without side effects unless status is Verified.
    pub async fn refresh_badges(&mut self) -> VerifyOutcome {
        if self.state.username.is_empty() || self.state.status != VerificationStatus::Verified {
            return VerifyOutcome::failure("Must be verified first");
        }

        self.state.is_fetching_badges = true;
        self.persist();

        let username = self.state.username.clone();
        match self.fetcher.fetch(&username).await {
            Ok(fetched) => {
                let badge_count = fetched.badges.len();
                self.state.earned_badges = fetched.badges.clone();
                self.state.badges_source = Some(fetched.source.tag().to_string());
                self.state.is_fetching_badges = false;
                self.persist();

                VerifyOutcome {
                    success: true,
                    message: format!("Updated! Found {badge_count} badges."),
                    badges: fetched.badges,
                }
            }
            Err(e) => {
                self.state.is_fetching_badges = false;
                self.persist();
                VerifyOutcome::failure(format!("Failed to fetch badges: {e}"))
            }
        }
    }

    /// Clear all state and remove the persisted copy. Immediate.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear()?;
        self.state = VerificationState::default();
        Ok(())
    }

    /// Record a failure: fetching flag cleared, status moves to Failed
    /// unless the profile was already Verified (token expiry and later
    /// failures never demote an established verification).
    fn fail(&mut self, message: impl Into<String>) -> VerifyOutcome {
        self.state.is_fetching_badges = false;
        if self.state.status != VerificationStatus::Verified {
            self.state.status = VerificationStatus::Failed;
        }
        self.persist();
        let message = message.into();
        warn!(username = %self.state.username, message = %message, "Verification failed");
        VerifyOutcome::failure(message)
    }

    /// Best-effort persistence of state and public profile
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            warn!(error = %e, "Failed to persist verification state");
        }
        if !self.state.username.is_empty() {
            if let Err(e) = self.store.save_profile(&self.state.profile_summary()) {
                warn!(error = %e, "Failed to persist public profile");
            }
        }
    }
}
