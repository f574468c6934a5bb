//! Workspace retriever
//!
//! Linear scan: embed the query, load every chunk of every processed
//! document in the workspace, score each by cosine similarity and keep the
//! top `k`.

use crate::similarity::{cosine_similarity, rank_top_k};
use async_trait::async_trait;
use quickonboard_common::db::models::decode_embedding;
use quickonboard_common::db::{Repository, RetrievedChunk};
use quickonboard_common::errors::{AppError, Result};
use quickonboard_common::metrics::record_embedding;
use quickonboard_common::Embedder;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Where retrievable chunks come from
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// All chunks of processed documents in a workspace, with document names
    async fn processed_chunks(&self, workspace_id: Uuid) -> Result<Vec<RetrievedChunk>>;
}

#[async_trait]
impl ChunkSource for Repository {
    async fn processed_chunks(&self, workspace_id: Uuid) -> Result<Vec<RetrievedChunk>> {
        Repository::processed_chunks(self, workspace_id).await
    }
}

/// A chunk with its similarity to the query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub content: String,
    pub chunk_index: i32,
    pub score: f32,
}

pub struct Retriever {
    source: Arc<dyn ChunkSource>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(source: Arc<dyn ChunkSource>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            source,
            embedder,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Best matching chunks for a query, highest similarity first
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve(&self, workspace_id: Uuid, query: &str) -> Result<Vec<ScoredChunk>> {
        let embed_start = Instant::now();
        let embedded = self.embedder.embed(query).await;
        record_embedding(
            embed_start.elapsed().as_secs_f64(),
            self.embedder.model_name(),
            embedded.is_ok(),
        );
        let query_embedding = embedded?;
        if query_embedding.is_empty() {
            return Err(AppError::EmbeddingError {
                message: "Query embedding is empty".to_string(),
            });
        }

        let candidates = self.source.processed_chunks(workspace_id).await?;
        let total = candidates.len();

        let scored = score_chunks(&query_embedding, candidates);
        let ranked = rank_top_k(scored, self.top_k);

        debug!(
            candidates = total,
            returned = ranked.len(),
            top_score = ranked.first().map(|(_, s)| *s),
            "Retrieval complete"
        );

        Ok(ranked
            .into_iter()
            .map(|(chunk, score)| ScoredChunk {
                chunk_id: chunk.chunk_id,
                document_id: chunk.document_id,
                document_name: chunk.document_name,
                content: chunk.content,
                chunk_index: chunk.chunk_index,
                score,
            })
            .collect())
    }
}

/// Score every chunk whose stored embedding parses and matches the query dimension
fn score_chunks(query: &[f32], chunks: Vec<RetrievedChunk>) -> Vec<(RetrievedChunk, f32)> {
    chunks
        .into_iter()
        .filter_map(|chunk| {
            let embedding = match decode_embedding(&chunk.embedding) {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(chunk_id = %chunk.chunk_id, error = %e, "Skipping chunk with unreadable embedding");
                    return None;
                }
            };
            if embedding.len() != query.len() {
                warn!(
                    chunk_id = %chunk.chunk_id,
                    expected = query.len(),
                    actual = embedding.len(),
                    "Skipping chunk with mismatched embedding dimension"
                );
                return None;
            }
            let score = cosine_similarity(query, &embedding);
            Some((chunk, score))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickonboard_common::db::models::encode_embedding;
    use quickonboard_common::embeddings::MockEmbedder;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemorySource {
        chunks: HashMap<Uuid, Vec<RetrievedChunk>>,
    }

    #[async_trait]
    impl ChunkSource for MemorySource {
        async fn processed_chunks(&self, workspace_id: Uuid) -> Result<Vec<RetrievedChunk>> {
            Ok(self.chunks.get(&workspace_id).cloned().unwrap_or_default())
        }
    }

    async fn chunk(embedder: &MockEmbedder, name: &str, content: &str, index: i32) -> RetrievedChunk {
        let embedding = embedder.embed(content).await.unwrap();
        RetrievedChunk {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            document_name: name.to_string(),
            content: content.to_string(),
            chunk_index: index,
            embedding: encode_embedding(&embedding),
        }
    }

    #[tokio::test]
    async fn test_exact_match_ranks_first() {
        let embedder = MockEmbedder::new(64);
        let ws = Uuid::new_v4();
        let mut source = MemorySource::default();
        source.chunks.insert(
            ws,
            vec![
                chunk(&embedder, "it.pdf", "Reset your laptop password in the portal", 0).await,
                chunk(&embedder, "hr.pdf", "Vacation days accrue monthly", 0).await,
                chunk(&embedder, "ops.pdf", "Parking passes are issued at reception", 0).await,
            ],
        );

        let retriever = Retriever::new(Arc::new(source), Arc::new(MockEmbedder::new(64)), 2);
        let results = retriever
            .retrieve(ws, "Vacation days accrue monthly")
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_name, "hr.pdf");
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_workspace_isolation() {
        let embedder = MockEmbedder::new(32);
        let ws_a = Uuid::new_v4();
        let ws_b = Uuid::new_v4();
        let mut source = MemorySource::default();
        source
            .chunks
            .insert(ws_a, vec![chunk(&embedder, "a.txt", "secret plans", 0).await]);

        let retriever = Retriever::new(Arc::new(source), Arc::new(embedder), 5);
        assert!(retriever.retrieve(ws_b, "secret plans").await.unwrap().is_empty());
        assert_eq!(retriever.retrieve(ws_a, "secret plans").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_skips_bad_embeddings() {
        let embedder = MockEmbedder::new(16);
        let ws = Uuid::new_v4();
        let good = chunk(&embedder, "good.txt", "benefits overview", 0).await;

        let mut garbled = good.clone();
        garbled.chunk_id = Uuid::new_v4();
        garbled.embedding = "not-a-vector".to_string();

        let mut short = good.clone();
        short.chunk_id = Uuid::new_v4();
        short.embedding = encode_embedding(&[1.0, 0.0]);

        let mut source = MemorySource::default();
        source.chunks.insert(ws, vec![garbled, good.clone(), short]);

        let retriever = Retriever::new(Arc::new(source), Arc::new(embedder), 5);
        let results = retriever.retrieve(ws, "benefits overview").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, good.chunk_id);
    }

    #[tokio::test]
    async fn test_zero_vector_scores_zero() {
        let embedder = MockEmbedder::new(8);
        let ws = Uuid::new_v4();
        let mut zero = chunk(&embedder, "blank.txt", "anything", 0).await;
        zero.embedding = encode_embedding(&[0.0; 8]);

        let mut source = MemorySource::default();
        source.chunks.insert(ws, vec![zero]);

        let retriever = Retriever::new(Arc::new(source), Arc::new(embedder), 5);
        let results = retriever.retrieve(ws, "anything").await.unwrap();
        assert_eq!(results[0].score, 0.0);
    }
}
