use chrono::Utc;
use tracing::{error, info, warn};

use super::transport::{ClassifierTransport, HttpTransport, ImageUpload, TransportResponse};
use super::types::{Classification, ClassificationResponse};
use crate::config::AppConfig;
use crate::error::ClassifyError;
use crate::retry::{retry_with_backoff, RetryPolicy};

const MAX_ERROR_BODY: usize = 512;

/// Posts images to the classifier and turns answers into [`Classification`]s.
///
/// Transient failures (no response, non-2xx other than 401) are retried per
/// the [`RetryPolicy`]. A 401 ends the call at once with
/// [`ClassifyError::SessionExpired`]; a 2xx without a recognized label ends
/// it with [`ClassifyError::InvalidResponse`].
pub struct ClassifierClient<T> {
    transport: T,
    policy: RetryPolicy,
}

impl ClassifierClient<HttpTransport> {
    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifyError> {
        let endpoint = config.endpoint()?;
        let transport = HttpTransport::new(endpoint, config.request_timeout())
            .map_err(ClassifyError::NetworkFailure)?;
        Ok(Self::new(transport, config.retry_policy()))
    }
}

impl<T: ClassifierTransport> ClassifierClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn classify(
        &self,
        upload: &ImageUpload,
        token: &str,
    ) -> Result<Classification, ClassifyError> {
        info!(
            "Classifying {} ({} bytes, up to {} attempts)",
            upload.file_name,
            upload.bytes.len(),
            self.policy.max_attempts
        );

        let mut attempts = 0;
        let response = retry_with_backoff(
            &self.policy,
            "classify",
            ClassifyError::is_retryable,
            |attempt| {
                attempts = attempt;
                self.attempt(upload, token)
            },
        )
        .await?;

        let label = response.recognize().map_err(|e| {
            warn!("Classifier returned an unusable label: {}", e);
            ClassifyError::InvalidResponse(e)
        })?;

        info!(
            "Classified {} as {} (confidence: {:?}, attempts: {})",
            upload.file_name, label, response.probability, attempts
        );

        Ok(Classification {
            label,
            confidence: response.probability,
            attempts,
            classified_at: Utc::now(),
        })
    }

    async fn attempt(
        &self,
        upload: &ImageUpload,
        token: &str,
    ) -> Result<ClassificationResponse, ClassifyError> {
        let response = self
            .transport
            .send(upload, token)
            .await
            .map_err(|e| ClassifyError::NetworkFailure(e.0))?;
        interpret_response(response)
    }
}

/// Map one HTTP answer to a decoded response or a classified error.
pub fn interpret_response(
    response: TransportResponse,
) -> Result<ClassificationResponse, ClassifyError> {
    if response.status == 401 {
        warn!("Classifier rejected the session token (401)");
        return Err(ClassifyError::SessionExpired);
    }

    if !response.is_success() {
        let body: String = response.body.chars().take(MAX_ERROR_BODY).collect();
        error!("Classifier error: HTTP {} - {}", response.status, body);
        return Err(ClassifyError::ServerError {
            status: response.status,
            body,
        });
    }

    ClassificationResponse::from_json(&response.body).map_err(ClassifyError::InvalidResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_success() {
        let resp = interpret_response(TransportResponse::new(200, r#"{"prediccion":"OME"}"#)).unwrap();
        assert_eq!(resp.label, "OME");
    }

    #[test]
    fn test_interpret_401() {
        let err = interpret_response(TransportResponse::new(401, "")).unwrap_err();
        assert!(matches!(err, ClassifyError::SessionExpired));
    }

    #[test]
    fn test_interpret_server_error_keeps_status() {
        let err = interpret_response(TransportResponse::new(503, "overloaded")).unwrap_err();
        match err {
            ClassifyError::ServerError { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_interpret_403_is_server_error_not_session() {
        let err = interpret_response(TransportResponse::new(403, "forbidden")).unwrap_err();
        assert!(matches!(err, ClassifyError::ServerError { status: 403, .. }));
    }

    #[test]
    fn test_interpret_garbage_body() {
        let err = interpret_response(TransportResponse::new(200, "OK")).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidResponse(_)));
    }
}
