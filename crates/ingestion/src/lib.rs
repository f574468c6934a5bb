//! QuickOnboard ingestion pipeline
//!
//! Turns an uploaded file into stored, embedded chunks:
//! extraction (PDF, DOCX, plain text) → chunking → batched embedding → storage.

pub mod chunker;
pub mod docx;
pub mod errors;
pub mod extractor;
pub mod pdf;
pub mod processor;

pub use chunker::{chunk_text, ChunkStrategy, ChunkingConfig, TextChunk};
pub use errors::IngestionError;
pub use extractor::{extract_text, DocumentFormat};
pub use processor::{ChunkStore, DocumentProcessor, ProcessingOutcome};
