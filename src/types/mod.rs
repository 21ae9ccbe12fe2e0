//! Common types for Badgeway

pub mod error;

pub use error::{BadgewayError, Result};
