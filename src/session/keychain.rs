use keyring::Entry;
use tracing::{info, warn};

use super::{SessionStore, SESSION_KEY};
use crate::error::SessionError;

pub const KEYRING_SERVICE: &str = "oido-match";

/// Whether this build links a persistent keychain. Elsewhere `keyring` falls
/// back to its in-process mock, which forgets every entry.
pub const NATIVE_KEYCHAIN: bool = cfg!(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "windows"
));

/// Session token kept in the OS keychain under service `oido-match`,
/// account `authToken`.
pub struct KeyringSessionStore {
    service: String,
}

impl KeyringSessionStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, SessionError> {
        Entry::new(&self.service, SESSION_KEY).map_err(|e| {
            warn!("Failed to create keyring entry for {}: {}", self.service, e);
            SessionError::Storage(e.to_string())
        })
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => {
                info!("No session token in keychain for {}", self.service);
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to read keychain for {}: {}", self.service, e);
                Err(SessionError::Storage(e.to_string()))
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        info!("Storing session token in keychain for {}", self.service);
        self.entry()?.set_password(token).map_err(|e| {
            warn!("Failed to write keychain for {}: {}", self.service, e);
            SessionError::Storage(e.to_string())
        })
    }

    fn clear(&self) -> Result<(), SessionError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete keychain entry for {}: {}", self.service, e);
                Err(SessionError::Storage(e.to_string()))
            }
        }
    }
}
