use thiserror::Error;

/// Failures of the session store (file or keychain).
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Refusing to store an empty session token")]
    EmptyToken,
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Everything that can go wrong between picking a file and showing a label.
#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    #[error("Invalid file type '{mime_type}': only image/* files are accepted")]
    InvalidFileType { mime_type: String },

    #[error("Failed to prepare preview: {0}")]
    Preview(String),

    #[error("No file selected")]
    NoFileSelected,

    #[error("A result is already shown; reset before classifying again")]
    AlreadyClassified,

    #[error("Not logged in: no session token available")]
    Unauthenticated,

    #[error("Session expired: classifier answered 401 Unauthorized")]
    SessionExpired,

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Classifier returned HTTP {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClassifyError {
    /// Only transport-level hiccups are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClassifyError::NetworkFailure(_) | ClassifyError::ServerError { .. }
        )
    }

    /// Whether the caller must drop the session and send the user back to login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ClassifyError::SessionExpired | ClassifyError::Unauthenticated
        )
    }

    /// Short message suitable for an inline, dismissible banner.
    pub fn user_message(&self) -> String {
        match self {
            ClassifyError::InvalidFileType { .. } => {
                "Please select an image file (JPEG, PNG, ...).".to_string()
            }
            ClassifyError::Preview(_) => "Could not open the selected file.".to_string(),
            ClassifyError::NoFileSelected => "Select an image before classifying.".to_string(),
            ClassifyError::AlreadyClassified => {
                "Start over to classify another image.".to_string()
            }
            ClassifyError::Unauthenticated => "You must log in to classify images.".to_string(),
            ClassifyError::SessionExpired => {
                "Your session has expired. Please log in again.".to_string()
            }
            ClassifyError::NetworkFailure(_) => {
                "Could not reach the classification service. Check your connection and try again."
                    .to_string()
            }
            ClassifyError::ServerError { status, .. } => format!(
                "The classification service failed (HTTP {}). Please try again.",
                status
            ),
            ClassifyError::InvalidResponse(_) => {
                "The classification service returned an unexpected answer.".to_string()
            }
            ClassifyError::Session(e) => format!("Could not update the session: {}", e),
            ClassifyError::Config(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ClassifyError::NetworkFailure("timeout".into()).is_retryable());
        assert!(ClassifyError::ServerError {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!ClassifyError::SessionExpired.is_retryable());
        assert!(!ClassifyError::InvalidResponse("no label".into()).is_retryable());
        assert!(!ClassifyError::Unauthenticated.is_retryable());
    }

    #[test]
    fn test_server_error_message_embeds_status() {
        let err = ClassifyError::ServerError {
            status: 502,
            body: "bad gateway".into(),
        };
        assert!(err.user_message().contains("502"));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_requires_login() {
        assert!(ClassifyError::SessionExpired.requires_login());
        assert!(!ClassifyError::NoFileSelected.requires_login());
    }
}
