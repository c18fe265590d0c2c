//! Upload/classify state machine.
//!
//! ```text
//! Idle --classify--> Uploading --ok--> Result
//!                             \--err-> Error --dismiss_error--> Idle
//! any --reset--> Idle
//! ```
//!
//! The selected file and its preview live beside the state, so an Error
//! keeps the file for another attempt. `classify` takes `&mut self`, which
//! keeps a single request in flight.

use tracing::{info, warn};

use crate::classifier::{Classification, ClassifierClient, ClassifierTransport, ImageUpload};
use crate::error::{ClassifyError, SessionError};
use crate::intake::{validate_mime_type, ImageCandidate, PreviewHandle};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    Uploading,
    Result(Classification),
    Error(String),
}

/// The file currently selected for classification.
#[derive(Debug)]
pub struct Selection {
    pub candidate: ImageCandidate,
    pub preview: PreviewHandle,
}

pub struct ClassifierWorkflow<S, T> {
    session: Session<S>,
    client: ClassifierClient<T>,
    upload_field: String,
    selection: Option<Selection>,
    state: UploadState,
    last_error: Option<ClassifyError>,
}

impl<S: SessionStore, T: ClassifierTransport> ClassifierWorkflow<S, T> {
    pub fn new(session: Session<S>, client: ClassifierClient<T>, upload_field: &str) -> Self {
        Self {
            session,
            client,
            upload_field: upload_field.to_string(),
            selection: None,
            state: UploadState::Idle,
            last_error: None,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.selection.as_ref().map(|s| &s.preview)
    }

    pub fn result(&self) -> Option<&Classification> {
        match &self.state {
            UploadState::Result(c) => Some(c),
            _ => None,
        }
    }

    /// The error behind the current Error state, if any.
    pub fn last_error(&self) -> Option<&ClassifyError> {
        self.last_error.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            UploadState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn client(&self) -> &ClassifierClient<T> {
        &self.client
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn login(&mut self, token: &str) -> Result<(), SessionError> {
        self.session.login(token)
    }

    /// Log out and drop any in-progress selection.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.reset();
        self.session.logout()
    }

    /// Whether the classify trigger should be enabled.
    pub fn can_classify(&self) -> bool {
        self.selection.is_some()
            && matches!(self.state, UploadState::Idle | UploadState::Error(_))
    }

    /// Replace the selected file. A non-image candidate leaves the current
    /// selection untouched and moves to Error.
    pub fn select_file(&mut self, candidate: ImageCandidate) -> Result<(), ClassifyError> {
        if let Err(e) = validate_mime_type(&candidate.mime_type) {
            warn!("Rejected {}: {}", candidate.file_name, e);
            return Err(self.fail(e));
        }

        let preview = PreviewHandle::create(&candidate).map_err(|e| {
            self.fail(ClassifyError::Preview(e.to_string()))
        })?;

        if let Some(previous) = self.selection.take() {
            previous.preview.release();
        }
        info!("Selected {} ({})", candidate.file_name, candidate.mime_type);
        self.selection = Some(Selection { candidate, preview });
        self.state = UploadState::Idle;
        self.last_error = None;
        Ok(())
    }

    /// Upload the selected file and wait for a label.
    ///
    /// On failure the state becomes Error with a user-facing message and the
    /// file stays selected. A 401 additionally logs the user out. Calling it
    /// while a result is shown fails with [`ClassifyError::AlreadyClassified`]
    /// and leaves the result in place.
    pub async fn classify(&mut self) -> Result<Classification, ClassifyError> {
        // Result only leaves through reset; the shown diagnosis stays as is.
        if matches!(self.state, UploadState::Result(_)) {
            return Err(ClassifyError::AlreadyClassified);
        }
        let upload = match &self.selection {
            Some(selection) => ImageUpload {
                field_name: self.upload_field.clone(),
                file_name: selection.candidate.file_name.clone(),
                mime_type: selection.candidate.mime_type.clone(),
                bytes: selection.candidate.bytes.clone(),
            },
            None => return Err(self.fail(ClassifyError::NoFileSelected)),
        };
        let token = match self.session.token() {
            Some(token) => token.to_string(),
            None => return Err(self.fail(ClassifyError::Unauthenticated)),
        };

        self.state = UploadState::Uploading;
        self.last_error = None;

        match self.client.classify(&upload, &token).await {
            Ok(classification) => {
                self.state = UploadState::Result(classification.clone());
                Ok(classification)
            }
            Err(e) => {
                if matches!(e, ClassifyError::SessionExpired) {
                    warn!("Session expired, forcing logout");
                    if let Err(store_err) = self.session.logout() {
                        warn!("Failed to clear persisted session: {}", store_err);
                    }
                }
                Err(self.fail(e))
            }
        }
    }

    /// Back to Idle from Error, keeping the selected file.
    pub fn dismiss_error(&mut self) {
        if matches!(self.state, UploadState::Error(_)) {
            self.state = UploadState::Idle;
            self.last_error = None;
        }
    }

    /// Release the preview and clear file, result and error.
    pub fn reset(&mut self) {
        if let Some(selection) = self.selection.take() {
            selection.preview.release();
        }
        self.state = UploadState::Idle;
        self.last_error = None;
    }

    /// Record `err` as the current Error state and hand it back to the caller.
    fn fail(&mut self, err: ClassifyError) -> ClassifyError {
        self.state = UploadState::Error(err.user_message());
        self.last_error = Some(err.clone());
        err
    }
}
