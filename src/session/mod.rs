//! Session gate: holds the bearer token and persists it through an injected store.

pub mod keychain;
pub mod store;

use tracing::{info, warn};

use crate::error::SessionError;

pub use keychain::{KeyringSessionStore, NATIVE_KEYCHAIN};
pub use store::{FileSessionStore, MemorySessionStore};

/// Fixed key the token is persisted under.
pub const SESSION_KEY: &str = "authToken";

/// Persistent slot for a single session token.
pub trait SessionStore {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn save(&self, token: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn load(&self) -> Result<Option<String>, SessionError> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

/// In-memory view of the session, backed by a store that is read once at
/// startup and written on every login/logout.
pub struct Session<S> {
    store: S,
    token: Option<String>,
}

impl<S: SessionStore> Session<S> {
    /// Read the persisted token. A store that cannot be read starts the
    /// session logged out instead of failing startup.
    pub fn init(store: S) -> Self {
        let token = match store.load() {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read persisted session, starting logged out: {}", e);
                None
            }
        };
        info!("Session initialised (logged in: {})", token.is_some());
        Self { store, token }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn login(&mut self, token: &str) -> Result<(), SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        self.store.save(token)?;
        self.token = Some(token.to_string());
        info!("User authenticated");
        Ok(())
    }

    /// Drop the in-memory token first so the user is logged out even if the
    /// store fails to forget it.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.token = None;
        self.store.clear()?;
        info!("Session closed");
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
