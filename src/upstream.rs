//! Upstream GraphQL client.
//!
//! Issues the fixed `userBadges` query against the LeetCode GraphQL API and
//! relays arbitrary GraphQL bodies for the proxy endpoint. The upstream is
//! treated as an external collaborator: no retries, status codes are passed
//! through, a transport failure is reported as-is.

use bytes::Bytes;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::badges::{Badge, GraphQlResponse, UpcomingBadge};
use crate::types::{BadgewayError, Result};

/// The fixed badge query sent for every badge fetch
pub const USER_BADGES_QUERY: &str = r#"
    query userBadges($username: String!) {
      matchedUser(username: $username) {
        badges {
          id
          name
          shortName
          displayName
          icon
          hoverText
          medal {
            slug
            config {
              iconGif
              iconGifBackground
            }
          }
          creationDate
          category
        }
        upcomingBadges {
          name
          icon
          progress
        }
      }
    }
"#;

/// Minimal profile query used by the ownership check
pub const USER_PROFILE_QUERY: &str = r#"
    query userProfile($username: String!) {
      matchedUser(username: $username) {
        profile {
          aboutMe
        }
      }
    }
"#;

/// Result of a badge query: the user either exists or they don't.
/// Transport and non-2xx failures are reported through `BadgewayError`.
#[derive(Debug)]
pub enum BadgeQueryOutcome {
    Found {
        badges: Vec<Badge>,
        upcoming: Vec<UpcomingBadge>,
    },
    UserNotFound,
}

/// Result of a profile bio lookup
#[derive(Debug)]
pub enum BioQueryOutcome {
    Found { about_me: String },
    UserNotFound,
}

/// Client for the upstream GraphQL service
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    graphql_url: String,
}

impl UpstreamClient {
    /// Create a client with the given endpoint and request timeout
    pub fn new(graphql_url: &str, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| BadgewayError::Internal(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            graphql_url: graphql_url.to_string(),
        })
    }

    /// Fetch the earned badge list for a username via the fixed query
    pub async fn fetch_badges(&self, username: &str) -> Result<BadgeQueryOutcome> {
        let body = json!({
            "query": USER_BADGES_QUERY,
            "variables": { "username": username },
        });

        debug!(username = %username, "Fetching badges from upstream");
        let response = self.post_graphql(body.to_string().into()).await?;
        let status = response.status();

        if !status.is_success() {
            warn!(username = %username, status = %status, "Upstream badge query failed");
            return Err(BadgewayError::Upstream {
                status: status.as_u16(),
                message: "LeetCode API error".to_string(),
            });
        }

        let parsed: GraphQlResponse = response.json().await?;
        match parsed.data.and_then(|d| d.matched_user) {
            None => Ok(BadgeQueryOutcome::UserNotFound),
            Some(user) => {
                let badges: Vec<Badge> =
                    user.badges.into_iter().map(|raw| raw.into_badge()).collect();
                debug!(username = %username, count = badges.len(), "Upstream badges fetched");
                Ok(BadgeQueryOutcome::Found {
                    badges,
                    upcoming: user.upcoming_badges,
                })
            }
        }
    }

    /// Fetch the public bio (aboutMe) for a username
    pub async fn fetch_bio(&self, username: &str) -> Result<BioQueryOutcome> {
        let body = json!({
            "query": USER_PROFILE_QUERY,
            "variables": { "username": username },
        });

        let response = self.post_graphql(body.to_string().into()).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(BadgewayError::Upstream {
                status: status.as_u16(),
                message: "LeetCode API error".to_string(),
            });
        }

        let parsed: GraphQlResponse = response.json().await?;
        match parsed.data.and_then(|d| d.matched_user) {
            None => Ok(BioQueryOutcome::UserNotFound),
            Some(user) => Ok(BioQueryOutcome::Found {
                about_me: user
                    .profile
                    .and_then(|p| p.about_me)
                    .unwrap_or_default(),
            }),
        }
    }

    /// Relay an arbitrary caller-supplied GraphQL body verbatim.
    ///
    /// Mirrors the upstream status and body. Known abuse vector: the body is
    /// forwarded unauthenticated and unvalidated (see DESIGN.md).
    pub async fn relay(&self, body: Bytes) -> Result<(u16, Bytes)> {
        let response = self.post_graphql(body).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok((status, bytes))
    }

    /// POST a JSON body with the fixed upstream header set
    async fn post_graphql(&self, body: Bytes) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&self.graphql_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Origin", "https://leetcode.com")
            .header("Referer", "https://leetcode.com/")
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )
            .body(body.to_vec())
            .send()
            .await?;
        Ok(response)
    }
}
