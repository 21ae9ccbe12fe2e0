//! Persistence for the verification state.
//!
//! Two JSON blobs under fixed names: the full state and a map of
//! lower-cased usernames to public profile summaries.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::types::{BadgewayError, Result};
use crate::verification::state::{ProfileSummary, VerificationState};

/// File name of the persisted verification state
pub const STATE_FILE: &str = "verification.json";

/// File name of the public profiles map
pub const PROFILES_FILE: &str = "profiles.json";

/// Client-local persistence for verification state and public profiles
pub trait StateStore: Send + Sync {
    /// Load the persisted state, if any
    fn load(&self) -> Result<Option<VerificationState>>;

    /// Persist the full state, overwriting any previous copy
    fn save(&self, state: &VerificationState) -> Result<()>;

    /// Remove the persisted state (public profiles are kept)
    fn clear(&self) -> Result<()>;

    /// Upsert a public profile entry, keyed by lower-cased username
    fn save_profile(&self, profile: &ProfileSummary) -> Result<()>;

    /// Look up a public profile by username (case-insensitive)
    fn load_profile(&self, username: &str) -> Result<Option<ProfileSummary>>;
}

/// File-backed state store under a configurable directory
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| BadgewayError::Internal(format!("Cannot create state dir: {e}")))?;
        Ok(Self { dir })
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn profiles_path(&self) -> PathBuf {
        self.dir.join(PROFILES_FILE)
    }

    fn read_profiles(&self) -> Result<HashMap<String, ProfileSummary>> {
        read_json_if_exists(&self.profiles_path()).map(|opt| opt.unwrap_or_default())
    }
}

fn read_json_if_exists<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<VerificationState>> {
        read_json_if_exists(&self.state_path())
    }

    fn save(&self, state: &VerificationState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(self.state_path(), json)?;
        debug!(path = %self.state_path().display(), "Verification state saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(self.state_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_profile(&self, profile: &ProfileSummary) -> Result<()> {
        let mut profiles = self.read_profiles()?;
        profiles.insert(profile.username.to_lowercase(), profile.clone());
        let json = serde_json::to_string_pretty(&profiles)?;
        fs::write(self.profiles_path(), json)?;
        Ok(())
    }

    fn load_profile(&self, username: &str) -> Result<Option<ProfileSummary>> {
        let profiles = self.read_profiles()?;
        Ok(profiles.get(&username.to_lowercase()).cloned())
    }
}

/// In-memory state store for tests and ephemeral use
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<VerificationState>>,
    profiles: DashMap<String, ProfileSummary>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<VerificationState>> {
        Ok(self.state.lock().expect("state lock poisoned").clone())
    }

    fn save(&self, state: &VerificationState) -> Result<()> {
        *self.state.lock().expect("state lock poisoned") = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.state.lock().expect("state lock poisoned") = None;
        Ok(())
    }

    fn save_profile(&self, profile: &ProfileSummary) -> Result<()> {
        self.profiles
            .insert(profile.username.to_lowercase(), profile.clone());
        Ok(())
    }

    fn load_profile(&self, username: &str) -> Result<Option<ProfileSummary>> {
        Ok(self
            .profiles
            .get(&username.to_lowercase())
            .map(|p| p.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::state::VerificationStatus;

    fn temp_store() -> FileStateStore {
        let dir = std::env::temp_dir().join(format!("badgeway-test-{}", uuid::Uuid::new_v4()));
        FileStateStore::new(dir).unwrap()
    }

    #[test]
    fn test_load_missing_state_is_none() {
        let store = temp_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_clear_roundtrip() {
        let store = temp_store();
        let state = VerificationState {
            username: "alice".into(),
            status: VerificationStatus::Pending,
            token: Some("LCBADGE-00FF00FF00FF00FF".into()),
            ..Default::default()
        };

        store.save(&state).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.status, VerificationStatus::Pending);
        assert_eq!(loaded.token.as_deref(), Some("LCBADGE-00FF00FF00FF00FF"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_profiles_keyed_case_insensitively() {
        let store = temp_store();
        let state = VerificationState {
            username: "AliceDev".into(),
            status: VerificationStatus::Verified,
            ..Default::default()
        };
        store.save_profile(&state.profile_summary()).unwrap();

        let profile = store.load_profile("alicedev").unwrap().unwrap();
        assert_eq!(profile.username, "AliceDev");
        assert!(profile.is_verified);
        assert!(store.load_profile("nobody").unwrap().is_none());
    }

    #[test]
    fn test_profile_upsert_overwrites() {
        let store = MemoryStateStore::new();
        let mut state = VerificationState {
            username: "alice".into(),
            ..Default::default()
        };
        store.save_profile(&state.profile_summary()).unwrap();
        assert!(!store.load_profile("alice").unwrap().unwrap().is_verified);

        state.status = VerificationStatus::Verified;
        store.save_profile(&state.profile_summary()).unwrap();
        assert!(store.load_profile("alice").unwrap().unwrap().is_verified);
    }
}
