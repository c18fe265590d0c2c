use std::path::Path;

use image::ImageFormat;
use tracing::debug;

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A file the user picked, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageCandidate {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk and work out its MIME type from content,
    /// then extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = sniff_mime_type(path, &bytes);
        debug!("Read {} ({} bytes, {})", file_name, bytes.len(), mime_type);
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    /// File extension, used to name the preview file.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Magic bytes win over the extension, so a renamed PDF stays a PDF.
pub fn sniff_mime_type(path: &Path, bytes: &[u8]) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    if looks_like_known_document(bytes) {
        return FALLBACK_MIME_TYPE.to_string();
    }
    ImageFormat::from_path(path)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME_TYPE.to_string())
}

fn looks_like_known_document(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF") || bytes.starts_with(b"PK\x03\x04")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::new_rgb8(8, 8);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_sniff_from_content() {
        let mime = sniff_mime_type(Path::new("photo.bin"), &png_bytes());
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn test_sniff_falls_back_to_extension() {
        let mime = sniff_mime_type(Path::new("scan.jpg"), b"truncated");
        assert_eq!(mime, "image/jpeg");
    }

    #[test]
    fn test_renamed_pdf_is_not_an_image() {
        let mime = sniff_mime_type(Path::new("photo.png"), b"%PDF-1.7 ...");
        assert_eq!(mime, FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_unknown_is_octet_stream() {
        assert_eq!(sniff_mime_type(Path::new("notes.txt"), b"hello"), FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ear.png");
        std::fs::write(&path, png_bytes()).unwrap();

        let candidate = ImageCandidate::from_path(&path).unwrap();
        assert_eq!(candidate.file_name, "ear.png");
        assert_eq!(candidate.mime_type, "image/png");
        assert_eq!(candidate.extension(), Some("png"));
        assert!(!candidate.is_empty());
    }
}
