//! QuickOnboard Search
//!
//! Semantic retrieval for workspace chat. Every processed chunk in the
//! workspace is scored against the query embedding and the best `top_k`
//! are returned.

pub mod retriever;
pub mod similarity;

pub use retriever::{ChunkSource, Retriever, ScoredChunk};
pub use similarity::{cosine_similarity, rank_top_k};
