//! Text extraction dispatch by MIME type

use crate::docx::extract_text_from_docx;
use crate::errors::IngestionError;
use crate::pdf::extract_text_from_pdf;
use tracing::debug;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

/// Formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// Resolve a declared MIME type, ignoring parameters such as `charset`
    pub fn from_mime(mime_type: &str) -> Result<Self, IngestionError> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            MIME_PDF => Ok(DocumentFormat::Pdf),
            MIME_DOCX | MIME_DOC => Ok(DocumentFormat::Docx),
            t if t.starts_with("text/") => Ok(DocumentFormat::Text),
            _ => Err(IngestionError::UnsupportedMimeType {
                mime_type: mime_type.to_string(),
            }),
        }
    }
}

/// Extract raw text from a file's bytes.
///
/// Fails for unsupported types and for files with no extractable text.
pub fn extract_text(bytes: &[u8], mime_type: &str) -> Result<String, IngestionError> {
    let format = DocumentFormat::from_mime(mime_type)?;

    let text = match format {
        DocumentFormat::Pdf => extract_text_from_pdf(bytes)?,
        DocumentFormat::Docx => extract_text_from_docx(bytes)?,
        DocumentFormat::Text => String::from_utf8_lossy(bytes).into_owned(),
    };

    if text.trim().is_empty() {
        return Err(IngestionError::EmptyDocument);
    }

    debug!(format = ?format, chars = text.chars().count(), "Text extracted");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_mime() {
        assert_eq!(DocumentFormat::from_mime("application/pdf").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_mime(MIME_DOCX).unwrap(), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_mime("application/msword").unwrap(), DocumentFormat::Docx);
        assert_eq!(
            DocumentFormat::from_mime("text/markdown; charset=utf-8").unwrap(),
            DocumentFormat::Text
        );
    }

    #[test]
    fn test_unsupported_names_the_type() {
        let err = extract_text(b"\x89PNG", "image/png").unwrap_err();
        match err {
            IngestionError::UnsupportedMimeType { mime_type } => assert_eq!(mime_type, "image/png"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_lossy() {
        let text = extract_text(b"Hello \xFFworld", "text/plain").unwrap();
        assert!(text.starts_with("Hello "));
        assert!(text.ends_with("world"));
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let err = extract_text(b"  \n\t ", "text/plain").unwrap_err();
        assert!(matches!(err, IngestionError::EmptyDocument));
    }
}
