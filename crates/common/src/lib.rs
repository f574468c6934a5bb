//! QuickOnboard Common Library
//!
//! Shared code for the QuickOnboard services including:
//! - Database models and repository patterns
//! - Embedding client abstraction
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Object storage for uploaded files
//! - Notification helpers
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod notifications;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use storage::BlobStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
