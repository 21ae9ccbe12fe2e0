//! Badge model and upstream response parsing.
//!
//! Badges are achievement records scraped from a LeetCode profile. They are
//! immutable once fetched; a refresh replaces the list wholesale, never
//! field-by-field. When the upstream is unreachable the fetcher can fall
//! back to a deterministic demo set seeded by a hash of the username, and
//! the result carries a typed source so callers can tell real data from
//! fallback data.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An earned badge from a LeetCode profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_gif: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_gif_background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_date: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medal: Option<String>,
}

/// A badge the user has not earned yet, with progress toward it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingBadge {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

/// Where a fetched badge list came from.
///
/// A `Fallback` result means the upstream was degraded and the list was
/// synthesized locally; it must never be confused with real profile data.
#[derive(Debug, Clone, PartialEq)]
pub enum BadgeSource {
    Real { via: String },
    Fallback { reason: String },
}

impl BadgeSource {
    /// Serialized tag used in persisted state and public profiles
    pub fn tag(&self) -> &str {
        match self {
            Self::Real { via } => via,
            Self::Fallback { .. } => "demo",
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real { .. })
    }
}

/// A fetched badge list with its provenance
#[derive(Debug, Clone)]
pub struct FetchedBadges {
    pub badges: Vec<Badge>,
    pub source: BadgeSource,
}

// ============================================================================
// Upstream response shapes
// ============================================================================

/// Top-level GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlData {
    /// `null` here means the user does not exist upstream
    #[serde(default)]
    pub matched_user: Option<MatchedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedUser {
    #[serde(default)]
    pub badges: Vec<RawBadge>,
    #[serde(default)]
    pub upcoming_badges: Vec<UpcomingBadge>,
    #[serde(default)]
    pub profile: Option<RawProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    #[serde(default)]
    pub about_me: Option<String>,
}

/// Badge as returned by the upstream query, before reshaping
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBadge {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub hover_text: Option<String>,
    #[serde(default)]
    pub medal: Option<RawMedal>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMedal {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub config: Option<RawMedalConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMedalConfig {
    #[serde(default)]
    pub icon_gif: Option<String>,
    #[serde(default)]
    pub icon_gif_background: Option<String>,
}

impl RawBadge {
    /// Reshape the upstream badge into our canonical form.
    ///
    /// Display name wins over short name over raw name for the label.
    pub fn into_badge(self) -> Badge {
        let name = self
            .display_name
            .clone()
            .or_else(|| self.short_name.clone())
            .or_else(|| self.name.clone())
            .unwrap_or_default();
        let (icon_gif, icon_gif_background, medal) = match self.medal {
            Some(medal) => {
                let (gif, bg) = match medal.config {
                    Some(cfg) => (cfg.icon_gif, cfg.icon_gif_background),
                    None => (None, None),
                };
                (gif, bg, medal.slug)
            }
            None => (None, None, None),
        };

        Badge {
            id: self.id,
            name,
            short_name: self.short_name,
            display_name: self.display_name,
            icon: self.icon,
            icon_gif,
            icon_gif_background,
            hover_text: self.hover_text,
            earned_date: self.creation_date,
            category: format_category(self.category.as_deref()),
            medal,
        }
    }
}

/// Map upstream category codes to display labels
pub fn format_category(category: Option<&str>) -> String {
    match category {
        Some("ANNUAL") => "Annual Badge".to_string(),
        Some("STUDY_PLAN") => "Study Plan".to_string(),
        Some("COMPETITION") => "Competition".to_string(),
        Some("DCC") => "Daily Challenge".to_string(),
        Some(other) if !other.is_empty() => other.to_string(),
        _ => "Achievement".to_string(),
    }
}

// ============================================================================
// Demo badge synthesis
// ============================================================================

struct PoolEntry {
    id: &'static str,
    name: &'static str,
    icon: &'static str,
    icon_gif: &'static str,
    earned_date: &'static str,
    category: &'static str,
}

/// Fixed pool the demo generator draws from
const BADGE_POOL: &[PoolEntry] = &[
    PoolEntry {
        id: "8628429",
        name: "200 Days Badge 2025",
        icon: "https://assets.leetcode.com/static_assets/others/lg200.png",
        icon_gif: "https://assets.leetcode.com/static_assets/others/200.gif",
        earned_date: "2025-11-05",
        category: "Annual Badge",
    },
    PoolEntry {
        id: "6785648",
        name: "100 Days Badge 2025",
        icon: "https://assets.leetcode.com/static_assets/others/lg25100.png",
        icon_gif: "https://assets.leetcode.com/static_assets/others/25100.gif",
        earned_date: "2025-04-10",
        category: "Annual Badge",
    },
    PoolEntry {
        id: "6251624",
        name: "50 Days Badge 2025",
        icon: "https://assets.leetcode.com/static_assets/others/lg2550.png",
        icon_gif: "https://assets.leetcode.com/static_assets/others/2550.gif",
        earned_date: "2025-02-20",
        category: "Annual Badge",
    },
    PoolEntry {
        id: "5770670",
        name: "100 Days Badge 2024",
        icon: "https://assets.leetcode.com/static_assets/marketing/2024-100-lg.png",
        icon_gif: "https://assets.leetcode.com/static_assets/marketing/2024-100-new.gif",
        earned_date: "2024-12-17",
        category: "Annual Badge",
    },
    PoolEntry {
        id: "5302968",
        name: "50 Days Badge 2024",
        icon: "https://assets.leetcode.com/static_assets/marketing/2024-50-lg.png",
        icon_gif: "https://assets.leetcode.com/static_assets/marketing/2024-50.gif",
        earned_date: "2024-10-28",
        category: "Annual Badge",
    },
    PoolEntry {
        id: "8972213",
        name: "Top SQL 50",
        icon: "https://assets.leetcode.com/static_assets/others/Top_SQL_50.png",
        icon_gif: "https://assets.leetcode.com/static_assets/others/Top_SQL_50.gif",
        earned_date: "2025-12-19",
        category: "Study Plan",
    },
    PoolEntry {
        id: "7654321",
        name: "LeetCode 75",
        icon: "https://assets.leetcode.com/static_assets/others/LeetCode_75.png",
        icon_gif: "https://assets.leetcode.com/static_assets/others/LeetCode_75.gif",
        earned_date: "2025-03-15",
        category: "Study Plan",
    },
    PoolEntry {
        id: "8765432",
        name: "Top Interview 150",
        icon: "https://assets.leetcode.com/static_assets/others/Top_Interview_150.png",
        icon_gif: "https://assets.leetcode.com/static_assets/others/Top_Interview_150.gif",
        earned_date: "2025-06-01",
        category: "Study Plan",
    },
];

/// Derive a deterministic seed from a username
fn username_seed(username: &str) -> u64 {
    let digest = Sha256::digest(username.to_lowercase().as_bytes());
    u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}

/// Synthesize a deterministic demo badge set for a username.
///
/// Same username always yields the same badges: the seed drives both the
/// badge count (2-6) and an LCG that picks distinct pool indices.
pub fn demo_badges(username: &str) -> Vec<Badge> {
    let hash = username_seed(username);
    let num_badges = ((hash % 5) + 2) as usize;

    let mut indices: Vec<usize> = Vec::new();
    let mut seed = hash;
    while indices.len() < num_badges && indices.len() < BADGE_POOL.len() {
        seed = (seed.wrapping_mul(1_103_515_245).wrapping_add(12_345)) & 0x7fff_ffff;
        let idx = (seed as usize) % BADGE_POOL.len();
        if !indices.contains(&idx) {
            indices.push(idx);
        }
    }

    indices
        .into_iter()
        .map(|idx| {
            let entry = &BADGE_POOL[idx];
            Badge {
                id: entry.id.to_string(),
                name: entry.name.to_string(),
                short_name: None,
                display_name: None,
                icon: Some(entry.icon.to_string()),
                icon_gif: Some(entry.icon_gif.to_string()),
                icon_gif_background: None,
                hover_text: None,
                earned_date: Some(entry.earned_date.to_string()),
                category: entry.category.to_string(),
                medal: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_category() {
        assert_eq!(format_category(Some("ANNUAL")), "Annual Badge");
        assert_eq!(format_category(Some("STUDY_PLAN")), "Study Plan");
        assert_eq!(format_category(Some("DCC")), "Daily Challenge");
        assert_eq!(format_category(Some("SOMETHING_ELSE")), "SOMETHING_ELSE");
        assert_eq!(format_category(None), "Achievement");
        assert_eq!(format_category(Some("")), "Achievement");
    }

    #[test]
    fn test_demo_badges_deterministic() {
        let a = demo_badges("alice");
        let b = demo_badges("alice");
        assert_eq!(a, b);

        // Case-insensitive seeding
        let c = demo_badges("ALICE");
        assert_eq!(a, c);
    }

    #[test]
    fn test_demo_badges_count_in_range() {
        for name in ["alice", "bob", "carol", "dave", "mallory"] {
            let badges = demo_badges(name);
            assert!(
                (2..=6).contains(&badges.len()),
                "{} got {} badges",
                name,
                badges.len()
            );
            // No duplicate pool entries
            let mut ids: Vec<&str> = badges.iter().map(|b| b.id.as_str()).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), badges.len());
        }
    }

    #[test]
    fn test_raw_badge_reshaping() {
        let raw: RawBadge = serde_json::from_value(serde_json::json!({
            "id": "5302968",
            "name": "lc50-2024",
            "shortName": "50 Days 2024",
            "displayName": "50 Days Badge 2024",
            "icon": "https://assets.leetcode.com/static_assets/marketing/2024-50-lg.png",
            "hoverText": "Solved for 50 days in 2024",
            "medal": {
                "slug": "50-days-2024",
                "config": {
                    "iconGif": "https://assets.leetcode.com/static_assets/marketing/2024-50.gif",
                    "iconGifBackground": "#ffffff"
                }
            },
            "creationDate": "2024-10-28",
            "category": "ANNUAL"
        }))
        .unwrap();

        let badge = raw.into_badge();
        assert_eq!(badge.name, "50 Days Badge 2024");
        assert_eq!(badge.category, "Annual Badge");
        assert_eq!(badge.medal.as_deref(), Some("50-days-2024"));
        assert_eq!(
            badge.icon_gif.as_deref(),
            Some("https://assets.leetcode.com/static_assets/marketing/2024-50.gif")
        );
        assert_eq!(badge.earned_date.as_deref(), Some("2024-10-28"));
    }

    #[test]
    fn test_matched_user_null_parses() {
        let resp: GraphQlResponse =
            serde_json::from_str(r#"{"data":{"matchedUser":null}}"#).unwrap();
        assert!(resp.data.unwrap().matched_user.is_none());
    }

    #[test]
    fn test_badge_roundtrips_camel_case() {
        let badge = demo_badges("alice").remove(0);
        let json = serde_json::to_value(&badge).unwrap();
        assert!(json.get("earnedDate").is_some());
        assert!(json.get("earned_date").is_none());
        let back: Badge = serde_json::from_value(json).unwrap();
        assert_eq!(back, badge);
    }
}
