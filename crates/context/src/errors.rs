//! Generation error types

use quickonboard_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("LLM request failed: {message}")]
    Request { message: String },

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned no answer")]
    EmptyResponse,

    #[error("Invalid LLM response: {message}")]
    InvalidResponse { message: String },

    #[error("LLM configuration error: {message}")]
    Configuration { message: String },
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Configuration { message } => AppError::Configuration { message },
            other => AppError::GenerationError {
                message: other.to_string(),
            },
        }
    }
}
