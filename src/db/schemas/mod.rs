//! Document schemas

pub mod badge_record;

pub use badge_record::{BadgeRecordDoc, BADGE_COLLECTION};
