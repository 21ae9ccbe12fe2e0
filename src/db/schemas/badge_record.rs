//! Stored badge record schema
//!
//! One record per username, holding the encrypted badge payload. Records are
//! created and overwritten by upsert only; there is no deletion path.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for stored badge records
pub const BADGE_COLLECTION: &str = "user_badges";

/// Badge record stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BadgeRecordDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Unique record key
    pub username: String,

    /// Encrypted serialized badge list (`hex(nonce):hex(ciphertext)`)
    pub encrypted: String,

    /// Last upsert time
    pub updated_at: DateTime,
}

impl IntoIndexes for BadgeRecordDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on username; upserts key on this field
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
