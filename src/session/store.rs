use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{SessionStore, SESSION_KEY};
use crate::error::SessionError;

/// Key-value JSON file holding the token under [`SESSION_KEY`].
///
/// Other keys in the file are preserved on write. Writes go through a temp
/// file in the same directory and an atomic rename.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| SessionError::Storage(format!("Failed to read {:?}: {}", self.path, e)))
    }

    fn parse_map(&self, raw: &str) -> Result<Map<String, Value>, SessionError> {
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SessionError::Storage(format!(
                "Session file {:?} is not a JSON object",
                self.path
            ))),
            Err(e) => Err(SessionError::Storage(format!(
                "Session file {:?} is not valid JSON: {}",
                self.path, e
            ))),
        }
    }

    fn read_map(&self) -> Result<Map<String, Value>, SessionError> {
        match self.read_raw()? {
            Some(raw) => self.parse_map(&raw),
            None => Ok(Map::new()),
        }
    }

    /// Current contents as the base for a rewrite. An unreadable file must
    /// not lock the slot, so a corrupt one is replaced by an empty object.
    fn map_for_write(&self) -> Result<(Map<String, Value>, bool), SessionError> {
        let raw = match self.read_raw()? {
            Some(raw) => raw,
            None => return Ok((Map::new(), false)),
        };
        match self.parse_map(&raw) {
            Ok(map) => Ok((map, false)),
            Err(e) => {
                warn!("{}; rewriting it", e);
                Ok((Map::new(), true))
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), SessionError> {
        let parent = self.path.parent().ok_or_else(|| {
            SessionError::Storage(format!("Session path has no parent: {:?}", self.path))
        })?;
        let io_err = |e: std::io::Error| {
            SessionError::Storage(format!("Failed to write {:?}: {}", self.path, e))
        };

        std::fs::create_dir_all(parent).map_err(io_err)?;

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| SessionError::Storage(format!("Failed to serialize session: {}", e)))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
        temp.write_all(json.as_bytes()).map_err(io_err)?;
        temp.flush().map_err(io_err)?;
        temp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!("Wrote session file {:?}", self.path);
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        let map = self.read_map()?;
        Ok(map
            .get(SESSION_KEY)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        let (mut map, _) = self.map_for_write()?;
        map.insert(SESSION_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(&map)?;
        info!("Stored session token in {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        if !self.path.exists() {
            return Ok(());
        }
        let (mut map, corrupt) = self.map_for_write()?;
        if map.remove(SESSION_KEY).is_some() || corrupt {
            self.write_map(&map)?;
            info!("Removed session token from {:?}", self.path);
        }
        Ok(())
    }
}

/// Volatile store for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: RefCell<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RefCell::new(Some(token.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.token.borrow().clone())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.token.borrow_mut() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.token.borrow_mut() = None;
        Ok(())
    }
}
