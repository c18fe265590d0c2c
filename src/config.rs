//! Application configuration.
//!
//! Read from `<config_dir>/oido-match/config.toml` when present, otherwise
//! defaults. A couple of environment variables override the file so the
//! endpoint can be switched without editing it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::session::NATIVE_KEYCHAIN;

pub const APP_DIR_NAME: &str = "oido-match";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SESSION_FILE_NAME: &str = "session.json";

pub const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:8000/predict";
pub const DEFAULT_UPLOAD_FIELD: &str = "image";

pub const ENV_CLASSIFIER_URL: &str = "OIDO_CLASSIFIER_URL";
pub const ENV_UPLOAD_FIELD: &str = "OIDO_UPLOAD_FIELD";

/// Where the session token lives between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub classifier_url: String,
    /// Multipart field carrying the image bytes.
    pub upload_field: String,
    pub request_timeout_secs: u64,
    pub session_backend: SessionBackend,
    /// Token file for the `file` backend. Defaults to the platform data dir.
    pub session_file: Option<PathBuf>,
    pub retry: RetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            classifier_url: DEFAULT_CLASSIFIER_URL.to_string(),
            upload_field: DEFAULT_UPLOAD_FIELD.to_string(),
            request_timeout_secs: 60,
            session_backend: SessionBackend::default(),
            session_file: None,
            retry: RetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default location of the config file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and silently skipped when missing. Environment overrides are
    /// applied last, then the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml(&raw)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CLASSIFIER_URL).filter(|v| !v.trim().is_empty()) {
            debug!("Classifier URL overridden by {}", ENV_CLASSIFIER_URL);
            self.classifier_url = url.trim().to_string();
        }
        if let Some(field) = lookup(ENV_UPLOAD_FIELD).filter(|v| !v.trim().is_empty()) {
            self.upload_field = field.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;
        if self.upload_field.trim().is_empty() {
            return Err(ConfigError::Invalid("upload_field must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
        }
        if self.session_backend == SessionBackend::Keyring && !NATIVE_KEYCHAIN {
            return Err(ConfigError::Invalid(
                "session_backend = \"keyring\" needs a native keychain (macOS or Windows); use \"file\"".into(),
            ));
        }
        Ok(())
    }

    /// Parsed classifier endpoint. Only http and https are accepted.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.classifier_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "classifier_url '{}' is not a valid URL: {}",
                self.classifier_url, e
            ))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid(format!(
                "classifier_url must use http or https, got '{}'",
                other
            ))),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }

    /// Session file path, falling back to `<data_dir>/oido-match/session.json`.
    pub fn session_file_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref p) = self.session_file {
            return Ok(p.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join(SESSION_FILE_NAME))
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "no platform data directory; set session_file in the config".into(),
                )
            })
    }
}
