//! Signed-in operator context.
//!
//! Authentication happens upstream; this module only keeps the resulting
//! token and user profile under the `r_to` / `r_ud` keys of a small
//! key-value store so a restarted process can pick the session back up.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{OrganizationId, UserId};

pub const TOKEN_KEY: &str = "r_to";
pub const USER_KEY: &str = "r_ud";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
}

/// Proof of sign-in handed to services and gateways by argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: String,
    user: UserProfile,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Auditor recorded on allocation writes.
    pub fn auditor_id(&self) -> &UserId {
        &self.user.id
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store io failure: {0}")]
    Io(#[from] io::Error),
    #[error("session store holds malformed data: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// String key-value storage for session material.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: String) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let entries = self.entries.lock().expect("session mutex poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().expect("session mutex poisoned");
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().expect("session mutex poisoned");
        entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten in full on every change.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            };
        }
        let encoded = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, encoded)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let _lock = self.guard.lock().expect("session file mutex poisoned");
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        let _lock = self.guard.lock().expect("session file mutex poisoned");
        let mut entries = self.read()?;
        entries.insert(key.to_string(), value);
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let _lock = self.guard.lock().expect("session file mutex poisoned");
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

/// Creates, restores and tears down [`SessionContext`]s over a store.
pub struct SessionManager<S> {
    store: Arc<S>,
}

impl<S> SessionManager<S>
where
    S: SessionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Persist a token/profile pair issued by the upstream login endpoint.
    pub fn sign_in(
        &self,
        token: impl Into<String>,
        user: UserProfile,
    ) -> Result<SessionContext, SessionError> {
        let context = SessionContext::new(token, user);
        self.store
            .set(USER_KEY, serde_json::to_string(context.user())?)?;
        self.store.set(TOKEN_KEY, context.token().to_string())?;
        info!(user = %context.user().id, "operator signed in");
        Ok(context)
    }

    /// Session left by an earlier process, if both keys are present.
    ///
    /// A half-written session (one key missing) is discarded.
    pub fn restore(&self) -> Result<Option<SessionContext>, SessionError> {
        let token = self.store.get(TOKEN_KEY)?;
        let user = self.store.get(USER_KEY)?;
        match (token, user) {
            (Some(token), Some(user)) => {
                let user: UserProfile = serde_json::from_str(&user)?;
                Ok(Some(SessionContext::new(token, user)))
            }
            (None, None) => Ok(None),
            _ => {
                warn!("discarding incomplete stored session");
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn sign_out(&self, context: SessionContext) -> Result<(), SessionError> {
        self.clear()?;
        info!(user = %context.user().id, "operator signed out");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::from("u-7"),
            name: "Marta Lima".to_string(),
            email: "marta@abrigo.org".to_string(),
            role: Some("coordinator".to_string()),
            organization_id: Some(OrganizationId::from("org-1")),
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("shelter-session-{label}-{nanos}.json"))
    }

    #[test]
    fn sign_in_then_restore_round_trips_profile() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone());
        let context = manager.sign_in("tok-1", profile()).expect("sign in");
        assert_eq!(context.auditor_id(), &UserId::from("u-7"));
        assert_eq!(
            store.get(TOKEN_KEY).expect("read").as_deref(),
            Some("tok-1")
        );

        let restored = manager.restore().expect("restore").expect("session present");
        assert_eq!(restored, context);
    }

    #[test]
    fn sign_out_clears_both_keys() {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone());
        let context = manager.sign_in("tok-1", profile()).expect("sign in");
        manager.sign_out(context).expect("sign out");
        assert!(store.get(TOKEN_KEY).expect("read").is_none());
        assert!(store.get(USER_KEY).expect("read").is_none());
        assert!(manager.restore().expect("restore").is_none());
    }

    #[test]
    fn incomplete_session_is_discarded() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(TOKEN_KEY, "orphan".to_string()).expect("write");
        let manager = SessionManager::new(store.clone());
        assert!(manager.restore().expect("restore").is_none());
        assert!(store.get(TOKEN_KEY).expect("read").is_none());
    }

    #[test]
    fn file_store_survives_a_new_instance() {
        let path = temp_path("persist");
        {
            let manager = SessionManager::new(Arc::new(FileSessionStore::new(&path)));
            manager.sign_in("tok-file", profile()).expect("sign in");
        }

        let manager = SessionManager::new(Arc::new(FileSessionStore::new(&path)));
        let restored = manager.restore().expect("restore").expect("session present");
        assert_eq!(restored.token(), "tok-file");
        assert_eq!(restored.user().email, "marta@abrigo.org");

        manager.sign_out(restored).expect("sign out");
        assert!(!path.exists(), "empty store removes its file");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = FileSessionStore::new(temp_path("absent"));
        assert!(store.get(TOKEN_KEY).expect("read").is_none());
        store.remove(USER_KEY).expect("remove on absent file");
    }
}
