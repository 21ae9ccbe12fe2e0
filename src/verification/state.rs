//! Verification state and token issuance

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::badges::Badge;

/// Fixed token prefix; tokens look like `LCBADGE-1A2B3C4D5E6F7890`
pub const TOKEN_PREFIX: &str = "LCBADGE";

/// Token validity window in hours
pub const TOKEN_TTL_HOURS: i64 = 48;

/// Lifecycle of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Idle,
    Pending,
    Verifying,
    Verified,
    Failed,
}

/// Full verification state, persisted wholesale on every change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationState {
    pub username: String,
    pub token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
    /// Badges scraped from LeetCode - earned, not self-declared
    pub earned_badges: Vec<Badge>,
    pub badges_source: Option<String>,
    pub is_fetching_badges: bool,
}

impl VerificationState {
    /// Whether the current token exists and has not expired
    pub fn token_is_valid(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, &self.token_expires_at) {
            (Some(_), Some(expires)) => *expires > now,
            _ => false,
        }
    }

    /// Normalize state loaded from storage.
    ///
    /// An expired token is cleared and Pending demotes back to Idle, but an
    /// already-Verified status survives token expiry.
    pub fn normalize_loaded(mut self, now: DateTime<Utc>) -> Self {
        let expired = matches!(&self.token_expires_at, Some(expires) if *expires <= now);
        if expired {
            self.token = None;
            self.token_expires_at = None;
            if self.status != VerificationStatus::Verified {
                self.status = VerificationStatus::Idle;
            }
        }
        self.is_fetching_badges = false;
        self
    }

    /// Public profile view of this state, keyed by lower-cased username
    pub fn profile_summary(&self) -> ProfileSummary {
        ProfileSummary {
            username: self.username.clone(),
            is_verified: self.status == VerificationStatus::Verified,
            verified_at: self.verified_at,
            badges: self.earned_badges.clone(),
            badges_source: self.badges_source.clone(),
        }
    }
}

/// Denormalized profile entry for cross-session lookup by other viewers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub username: String,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub badges: Vec<Badge>,
    pub badges_source: Option<String>,
}

/// A freshly issued token with its expiry
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue a new token: `LCBADGE-` plus 16 uppercase hex chars from OsRng
pub fn issue_token(now: DateTime<Utc>) -> TokenGrant {
    let mut random = [0u8; 8];
    OsRng.fill_bytes(&mut random);
    TokenGrant {
        token: format!("{}-{}", TOKEN_PREFIX, hex::encode_upper(random)),
        expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let grant = issue_token(Utc::now());
        let (prefix, suffix) = grant.token.split_once('-').unwrap();
        assert_eq!(prefix, TOKEN_PREFIX);
        assert_eq!(suffix.len(), 16);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_token_expiry_is_48_hours() {
        let now = Utc::now();
        let grant = issue_token(now);
        assert_eq!(grant.expires_at - now, Duration::hours(48));
    }

    #[test]
    fn test_tokens_are_random() {
        let a = issue_token(Utc::now());
        let b = issue_token(Utc::now());
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_normalize_clears_expired_token() {
        let now = Utc::now();
        let state = VerificationState {
            username: "alice".into(),
            token: Some("LCBADGE-0000000000000000".into()),
            token_expires_at: Some(now - Duration::hours(1)),
            status: VerificationStatus::Pending,
            ..Default::default()
        };

        let normalized = state.normalize_loaded(now);
        assert!(normalized.token.is_none());
        assert!(normalized.token_expires_at.is_none());
        assert_eq!(normalized.status, VerificationStatus::Idle);
    }

    #[test]
    fn test_normalize_keeps_verified_status_on_expiry() {
        let now = Utc::now();
        let state = VerificationState {
            username: "alice".into(),
            token: Some("LCBADGE-0000000000000000".into()),
            token_expires_at: Some(now - Duration::hours(1)),
            status: VerificationStatus::Verified,
            verified_at: Some(now - Duration::hours(24)),
            ..Default::default()
        };

        let normalized = state.normalize_loaded(now);
        assert!(normalized.token.is_none());
        assert_eq!(normalized.status, VerificationStatus::Verified);
        assert!(normalized.verified_at.is_some());
    }

    #[test]
    fn test_normalize_keeps_live_token() {
        let now = Utc::now();
        let state = VerificationState {
            username: "alice".into(),
            token: Some("LCBADGE-0000000000000000".into()),
            token_expires_at: Some(now + Duration::hours(1)),
            status: VerificationStatus::Pending,
            ..Default::default()
        };

        let normalized = state.normalize_loaded(now);
        assert!(normalized.token.is_some());
        assert_eq!(normalized.status, VerificationStatus::Pending);
        assert!(normalized.token_is_valid(now));
    }
}
