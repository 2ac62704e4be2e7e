//! Bearer token ownership.
//!
//! The [`Session`] is handed to the [`crate::GatewayClient`] at construction
//! time. The client reads the current token for every request and clears
//! it when the gateway answers 401. Persistence is delegated to a
//! [`TokenStore`]; store failures are logged and never fail the session.

use kate_core::error::KateError;
use kate_core::state::{StateCell, Subscription};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Persistence backend for the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, KateError>;
    fn save(&self, token: &str) -> Result<(), KateError>;
    fn clear(&self) -> Result<(), KateError>;
}

/// Token kept in memory only.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, KateError> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn save(&self, token: &str) -> Result<(), KateError> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), KateError> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

/// Token kept in a plain file.
///
/// Writes go to a `.tmp` sibling first and are renamed over the final
/// path, so an interrupted write never leaves a truncated token behind.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, KateError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), KateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, token)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), KateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
}

/// Holder of the current bearer token.
pub struct Session {
    state: StateCell<SessionState>,
    store: Arc<dyn TokenStore>,
}

impl Session {
    /// Open a session, restoring any token the store already holds.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "session: failed to load stored token");
                None
            }
        };
        Self {
            state: StateCell::new(SessionState { token }),
            store,
        }
    }

    /// Session with no persistence and no token.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::default()))
    }

    /// Current bearer token, `None` when signed out.
    pub fn token(&self) -> Option<String> {
        self.state.snapshot().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.snapshot().token.is_some()
    }

    pub fn save_token(&self, token: impl Into<String>) {
        let token = token.into();
        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "session: failed to persist token");
        }
        self.state.emit(SessionState { token: Some(token) });
        debug!("session: token saved");
    }

    /// Forget the token and notify subscribers.
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "session: failed to clear stored token");
        }
        self.state.emit(SessionState { token: None });
        debug!("session: token cleared");
    }

    pub fn subscribe(&self, listener: impl Fn(&SessionState) + Send + Sync + 'static) -> Subscription {
        self.state.subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn in_memory_session_starts_signed_out() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[test]
    fn save_and_clear_notify_subscribers() {
        let session = Session::in_memory();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        let _sub = session.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.save_token("abc");
        assert_eq!(session.token().as_deref(), Some("abc"));
        session.clear();
        assert!(session.token().is_none());
        assert_eq!(events.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn session_restores_token_from_store() {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("restored")));
        assert_eq!(session.token().as_deref(), Some("restored"));
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));
        assert!(store.load().unwrap().is_none());

        store.save("secret-token").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("secret-token"));
        assert!(!dir.path().join("nested").join("token.tmp").exists());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn file_backed_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");

        Session::new(Arc::new(FileTokenStore::new(&path))).save_token("t-1");
        let reopened = Session::new(Arc::new(FileTokenStore::new(&path)));
        assert_eq!(reopened.token().as_deref(), Some("t-1"));
    }
}
