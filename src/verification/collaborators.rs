//! HTTP-backed collaborators for the verification flow.
//!
//! These talk to a badgeway server: the profile query is relayed through the
//! server's GraphQL proxy so the client never hits LeetCode cross-origin,
//! badge fetches go through the reshaping endpoint, and storage posts to the
//! encrypted store. The badge fetcher degrades to a deterministic demo set
//! when the server-side fetch path is unavailable; the sink never degrades.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::badges::{demo_badges, Badge, BadgeSource, FetchedBadges, GraphQlResponse, UpcomingBadge};
use crate::types::{BadgewayError, Result};
use crate::upstream::USER_PROFILE_QUERY;
use crate::verification::flow::{BadgeFetcher, BadgeSink, BioCheck, ProfileChecker};

fn build_http(timeout_ms: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| BadgewayError::Internal(format!("HTTP client build failed: {e}")))
}

/// Phase-1 checker: looks for the token in the profile's public bio,
/// querying through the server's GraphQL relay.
pub struct ProxyProfileChecker {
    http: reqwest::Client,
    graphql_url: String,
}

impl ProxyProfileChecker {
    pub fn new(server_url: &str, timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            http: build_http(timeout_ms)?,
            graphql_url: format!("{}/graphql", server_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ProfileChecker for ProxyProfileChecker {
    async fn check_bio(&self, username: &str, token: &str) -> Result<BioCheck> {
        let body = json!({
            "query": USER_PROFILE_QUERY,
            "variables": { "username": username },
        });

        debug!(username = %username, url = %self.graphql_url, "Fetching profile bio via relay");
        let response = self
            .http
            .post(&self.graphql_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BadgewayError::Upstream {
                status: status.as_u16(),
                message: "Profile lookup failed".to_string(),
            });
        }

        let parsed: GraphQlResponse = response.json().await?;
        let user = match parsed.data.and_then(|d| d.matched_user) {
            Some(user) => user,
            None => {
                return Ok(BioCheck {
                    verified: false,
                    message: Some("User not found on LeetCode".to_string()),
                })
            }
        };

        let about_me = user
            .profile
            .and_then(|p| p.about_me)
            .unwrap_or_default();
        if about_me.contains(token) {
            Ok(BioCheck {
                verified: true,
                message: None,
            })
        } else {
            Ok(BioCheck {
                verified: false,
                message: Some(
                    "Token not found in profile bio. Add it to your LeetCode summary and try again."
                        .to_string(),
                ),
            })
        }
    }
}

/// Badge list as served by the fetch endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BadgesPayload {
    #[allow(dead_code)]
    username: String,
    #[serde(default)]
    badges: Vec<Badge>,
    #[serde(default)]
    #[allow(dead_code)]
    upcoming_badges: Vec<UpcomingBadge>,
}

/// Phase-2 fetcher against the server's badge endpoint.
///
/// A nonexistent user is an error; an unreachable or failing server is
/// answered with the deterministic demo set so the flow can complete with
/// clearly-tagged fallback data.
pub struct ProxyBadgeFetcher {
    http: reqwest::Client,
    server_url: String,
}

impl ProxyBadgeFetcher {
    pub fn new(server_url: &str, timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            http: build_http(timeout_ms)?,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    fn fallback(&self, username: &str, reason: impl Into<String>) -> FetchedBadges {
        let reason = reason.into();
        warn!(username = %username, reason = %reason, "Badge fetch degraded to demo data");
        FetchedBadges {
            badges: demo_badges(username),
            source: BadgeSource::Fallback { reason },
        }
    }
}

#[async_trait]
impl BadgeFetcher for ProxyBadgeFetcher {
    async fn fetch(&self, username: &str) -> Result<FetchedBadges> {
        let url = format!(
            "{}/badges/{}",
            self.server_url,
            urlencoding::encode(username)
        );

        debug!(username = %username, url = %url, "Fetching badges via server");
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return Ok(self.fallback(username, format!("server unreachable: {e}"))),
        };

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(BadgewayError::NotFound("User not found on LeetCode".into()));
        }
        if !status.is_success() {
            return Ok(self.fallback(username, format!("server returned {status}")));
        }

        let payload: BadgesPayload = match response.json().await {
            Ok(payload) => payload,
            Err(e) => return Ok(self.fallback(username, format!("bad badge payload: {e}"))),
        };

        Ok(FetchedBadges {
            badges: payload.badges,
            source: BadgeSource::Real {
                via: "backend-proxy".to_string(),
            },
        })
    }
}

/// Stores a badge list through the server's encrypted store endpoint
pub struct HttpBadgeSink {
    http: reqwest::Client,
    store_url: String,
}

impl HttpBadgeSink {
    pub fn new(server_url: &str, timeout_ms: u64) -> Result<Self> {
        Ok(Self {
            http: build_http(timeout_ms)?,
            store_url: format!("{}/badges/store", server_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl BadgeSink for HttpBadgeSink {
    async fn store(&self, username: &str, badges: &[Badge]) -> Result<()> {
        let body = json!({
            "username": username,
            "badges": badges,
        });

        let response = self.http.post(&self.store_url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BadgewayError::Database(format!(
                "Badge store returned {status}: {detail}"
            )));
        }

        debug!(username = %username, count = badges.len(), "Badges stored");
        Ok(())
    }
}
