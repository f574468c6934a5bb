//! Ingestion error types

use quickonboard_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unsupported file type: {mime_type}")]
    UnsupportedMimeType { mime_type: String },

    #[error("No text content could be extracted")]
    EmptyDocument,

    #[error("PDF parse error: {message}")]
    PdfParse { message: String },

    #[error("DOCX parse error: {message}")]
    DocxParse { message: String },

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Embedding error: {message}")]
    Embedding { message: String },

    #[error("Embedding count mismatch: sent {expected} chunks, received {actual} vectors")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Backend(#[from] AppError),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::UnsupportedMimeType { mime_type } => {
                AppError::UnsupportedMimeType { mime_type }
            }
            IngestionError::EmptyDocument
            | IngestionError::PdfParse { .. }
            | IngestionError::DocxParse { .. } => AppError::Extraction {
                message: e.to_string(),
            },
            IngestionError::Chunking(message) => AppError::Configuration { message },
            IngestionError::Embedding { message } => AppError::EmbeddingError { message },
            IngestionError::EmbeddingCountMismatch { .. } => AppError::EmbeddingError {
                message: e.to_string(),
            },
            IngestionError::Backend(inner) => inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: IngestionError) -> u16 {
        AppError::from(e).status_code().as_u16()
    }

    #[test]
    fn test_conversion_to_app_error() {
        let unsupported = IngestionError::UnsupportedMimeType {
            mime_type: "image/png".into(),
        };
        assert_eq!(status_of(unsupported), 415);
        assert_eq!(status_of(IngestionError::EmptyDocument), 422);
        assert_eq!(
            status_of(IngestionError::EmbeddingCountMismatch { expected: 10, actual: 9 }),
            500
        );
    }
}
