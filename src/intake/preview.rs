//! Preview handles.
//!
//! A preview is a temporary file holding the selected image so a viewer can
//! display it before upload. The handle owns the file: releasing it (or
//! dropping it) deletes the file, and a moved-out handle cannot be released
//! twice.

use std::io::Write;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};
use url::Url;

use super::ImageCandidate;

#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
    mime_type: String,
}

impl PreviewHandle {
    /// Write the candidate's bytes to a fresh temp file.
    pub fn create(candidate: &ImageCandidate) -> std::io::Result<Self> {
        let suffix = candidate
            .extension()
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let mut file = Builder::new()
            .prefix("oido-preview-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(&candidate.bytes)?;
        file.flush()?;
        debug!(
            "Created preview for {} at {:?}",
            candidate.file_name,
            file.path()
        );
        Ok(Self {
            file,
            mime_type: candidate.mime_type.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// `file://` URL of the preview, for viewers that take a URL.
    pub fn url(&self) -> Option<Url> {
        Url::from_file_path(self.file.path()).ok()
    }

    /// Inline `data:` URL with the image bytes.
    pub fn data_url(&self) -> std::io::Result<String> {
        let bytes = std::fs::read(self.file.path())?;
        Ok(format!("data:{};base64,{}", self.mime_type, STANDARD.encode(bytes)))
    }

    /// Delete the preview file.
    pub fn release(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Released preview {:?}", path),
            Err(e) => warn!("Failed to remove preview {:?}: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> ImageCandidate {
        ImageCandidate::new("ear.png", "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn test_preview_holds_bytes_until_released() {
        let preview = PreviewHandle::create(&candidate()).unwrap();
        let path = preview.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(std::fs::read(&path).unwrap(), candidate().bytes);

        preview.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_also_cleans_up() {
        let path = {
            let preview = PreviewHandle::create(&candidate()).unwrap();
            preview.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_urls() {
        let preview = PreviewHandle::create(&candidate()).unwrap();
        assert_eq!(preview.url().unwrap().scheme(), "file");
        let data_url = preview.data_url().unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));
    }
}
