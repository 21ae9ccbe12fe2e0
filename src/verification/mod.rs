//! Verification/token state machine.
//!
//! Drives the client-side flow: generate a one-time token, check that the
//! user placed it in their public LeetCode bio, then fetch and persist the
//! earned badge list. State survives restarts through a [`StateStore`] and
//! is mirrored into a public-profiles map for cross-session lookup.

pub mod collaborators;
pub mod flow;
pub mod state;
pub mod store;

pub use collaborators::{HttpBadgeSink, ProxyBadgeFetcher, ProxyProfileChecker};
pub use flow::{BadgeFetcher, BadgeSink, BioCheck, ProfileChecker, VerificationFlow, VerifyOutcome};
pub use state::{
    ProfileSummary, TokenGrant, VerificationState, VerificationStatus, TOKEN_PREFIX,
    TOKEN_TTL_HOURS,
};
pub use store::{FileStateStore, MemoryStateStore, StateStore};
