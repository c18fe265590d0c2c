//! File intake: MIME validation and revocable preview handles.

pub mod candidate;
pub mod preview;

pub use candidate::{sniff_mime_type, ImageCandidate};
pub use preview::PreviewHandle;

use crate::error::ClassifyError;

/// Accept only `image/*` candidates.
pub fn validate_mime_type(mime_type: &str) -> Result<(), ClassifyError> {
    if mime_type.trim().to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(ClassifyError::InvalidFileType {
            mime_type: mime_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_image_types() {
        assert!(validate_mime_type("image/png").is_ok());
        assert!(validate_mime_type("image/jpeg").is_ok());
        assert!(validate_mime_type("IMAGE/WEBP").is_ok());
    }

    #[test]
    fn test_rejects_everything_else() {
        for mime in ["application/pdf", "text/plain", "", "imagepng", "video/mp4"] {
            let err = validate_mime_type(mime).unwrap_err();
            assert!(matches!(err, ClassifyError::InvalidFileType { .. }), "{}", mime);
        }
    }
}
