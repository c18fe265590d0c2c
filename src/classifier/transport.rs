//! HTTP transport for the classifier.
//!
//! The client only needs "send this upload, give me status and body", so the
//! network sits behind [`ClassifierTransport`] and tests can script answers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, error};
use url::Url;

/// Multipart payload for one classification request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Status and body of an answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

#[async_trait]
pub trait ClassifierTransport: Send + Sync {
    async fn send(
        &self,
        upload: &ImageUpload,
        token: &str,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport posting to a fixed endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("oido-match/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self::with_client(client, endpoint, timeout))
    }

    /// Use a preconfigured client (custom TLS, proxy settings, ...).
    pub fn with_client(client: reqwest::Client, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ClassifierTransport for HttpTransport {
    async fn send(
        &self,
        upload: &ImageUpload,
        token: &str,
    ) -> Result<TransportResponse, TransportError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| TransportError(format!("Invalid MIME type '{}': {}", upload.mime_type, e)))?;
        let form = Form::new().part(upload.field_name.clone(), part);

        debug!(
            "POST {} ({} bytes as '{}')",
            self.endpoint,
            upload.bytes.len(),
            upload.field_name
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    format!("Classifier request timed out after {}s", self.timeout.as_secs())
                } else if e.is_connect() {
                    format!("Could not connect to {}: {}", self.endpoint, e)
                } else {
                    format!("Classifier request failed: {}", e)
                };
                error!("{}", msg);
                TransportError(msg)
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("Failed to read classifier response: {}", e)))?;

        Ok(TransportResponse { status, body })
    }
}
