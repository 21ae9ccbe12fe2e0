//! Badgeway - HTTP gateway for LeetCode badge verification
//!
//! Badgeway lets a user prove ownership of a LeetCode account by placing a
//! one-time token in their public bio, then publishes the account's earned
//! badges under shareable URLs backed by MongoDB with encrypted payloads.

pub mod badges;
pub mod config;
pub mod crypto;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;
pub mod upstream;
pub mod verification;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{BadgewayError, Result};
