//! Document processor
//!
//! Core ingestion logic: extract text, chunk it, embed chunks in fixed-size
//! batches, store each batch atomically, then mark the document processed.

use crate::chunker::{chunk_text, ChunkingConfig};
use crate::errors::IngestionError;
use crate::extractor::extract_text;
use async_trait::async_trait;
use quickonboard_common::db::models::Document;
use quickonboard_common::db::Repository;
use quickonboard_common::errors::AppError;
use quickonboard_common::metrics::{record_embedding, record_ingestion};
use quickonboard_common::{BlobStore, Embedder};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Persistence the processor needs for chunks
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Remove all chunks of a document, returning how many were deleted
    async fn delete_chunks(&self, document_id: Uuid) -> Result<u64, AppError>;

    /// Store one batch of `(chunk_index, content, embedding)` atomically
    async fn insert_chunk_batch(
        &self,
        document_id: Uuid,
        chunks: Vec<(i32, String, Vec<f32>)>,
    ) -> Result<u64, AppError>;

    async fn set_processed(&self, document_id: Uuid, processed: bool) -> Result<(), AppError>;
}

#[async_trait]
impl ChunkStore for Repository {
    async fn delete_chunks(&self, document_id: Uuid) -> Result<u64, AppError> {
        Repository::delete_chunks(self, document_id).await
    }

    async fn insert_chunk_batch(
        &self,
        document_id: Uuid,
        chunks: Vec<(i32, String, Vec<f32>)>,
    ) -> Result<u64, AppError> {
        Repository::insert_chunk_batch(self, document_id, chunks).await
    }

    async fn set_processed(&self, document_id: Uuid, processed: bool) -> Result<(), AppError> {
        self.set_document_processed(document_id, processed).await
    }
}

/// Result of processing one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOutcome {
    pub document_id: Uuid,
    pub chunk_count: usize,
    pub removed_chunks: u64,
}

/// Ingestion processor
pub struct DocumentProcessor {
    store: Arc<dyn ChunkStore>,
    blobs: Arc<dyn BlobStore>,
    embedder: Arc<dyn Embedder>,
    chunking_config: ChunkingConfig,
    batch_size: usize,
}

impl DocumentProcessor {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        blobs: Arc<dyn BlobStore>,
        embedder: Arc<dyn Embedder>,
        chunking_config: ChunkingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            blobs,
            embedder,
            chunking_config,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch a stored document's bytes and process them
    #[instrument(skip(self, document), fields(document_id = %document.id, name = %document.name))]
    pub async fn process_stored(&self, document: &Document) -> Result<ProcessingOutcome, IngestionError> {
        let bytes = self.blobs.get(&document.url).await?;
        self.process_bytes(document.id, &bytes, &document.mime_type).await
    }

    /// Process a document whose bytes are already in memory.
    ///
    /// Existing chunks are removed first, so this doubles as reprocessing.
    /// On failure the document stays unprocessed; batches stored before the
    /// failure are cleaned up by the next attempt.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn process_bytes(
        &self,
        document_id: Uuid,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ProcessingOutcome, IngestionError> {
        let start = Instant::now();

        let result = self.run(document_id, bytes, mime_type).await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(outcome) => {
                record_ingestion(elapsed, outcome.chunk_count, true);
                info!(
                    chunk_count = outcome.chunk_count,
                    removed_chunks = outcome.removed_chunks,
                    duration_ms = (elapsed * 1000.0) as u64,
                    "Document processed"
                );
                Ok(outcome)
            }
            Err(e) => {
                record_ingestion(elapsed, 0, false);
                warn!(error = %e, "Document processing failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        document_id: Uuid,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ProcessingOutcome, IngestionError> {
        self.store.set_processed(document_id, false).await?;
        let removed_chunks = self.store.delete_chunks(document_id).await?;

        let text = extract_text(bytes, mime_type)?;
        let chunks = chunk_text(&text, &self.chunking_config)?;
        if chunks.is_empty() {
            return Err(IngestionError::EmptyDocument);
        }

        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let embed_start = Instant::now();
            let embeddings = self.embedder.embed_batch(&texts).await;
            let embed_secs = embed_start.elapsed().as_secs_f64();
            record_embedding(embed_secs, self.embedder.model_name(), embeddings.is_ok());

            let embeddings = embeddings.map_err(|e| IngestionError::Embedding {
                message: e.to_string(),
            })?;
            if embeddings.len() != texts.len() {
                return Err(IngestionError::EmbeddingCountMismatch {
                    expected: texts.len(),
                    actual: embeddings.len(),
                });
            }

            let rows: Vec<(i32, String, Vec<f32>)> = texts
                .into_iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, (content, embedding))| ((offset + i) as i32, content, embedding))
                .collect();

            self.store.insert_chunk_batch(document_id, rows).await?;
        }

        self.store.set_processed(document_id, true).await?;

        Ok(ProcessingOutcome {
            document_id,
            chunk_count: chunks.len(),
            removed_chunks,
        })
    }
}
