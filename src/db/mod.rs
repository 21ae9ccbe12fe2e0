//! Database layer for Badgeway
//!
//! Provides MongoDB storage for encrypted badge records, one per username.

pub mod mongo;
pub mod schemas;

pub use mongo::{BadgeStore, MongoClient};
pub use schemas::{BadgeRecordDoc, BADGE_COLLECTION};
