//! Grounded answer generation
//!
//! retrieve top chunks → build context → render prompt → LLM → answer with
//! confidence and distinct source documents.

use crate::llm::ChatModel;
use crate::prompt::{build_context, render_prompt, NO_INFORMATION_REPLY};
use quickonboard_common::errors::Result;
use quickonboard_common::metrics::record_chat;
use quickonboard_search::{Retriever, ScoredChunk};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Lowest reported confidence
pub const MIN_CONFIDENCE: i32 = 50;
/// Highest reported confidence
pub const MAX_CONFIDENCE: i32 = 100;

/// A generated answer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Answer {
    pub answer: String,
    /// Percentage in `[50, 100]`
    pub confidence: i32,
    /// Distinct document names in rank order
    pub sources: Vec<String>,
    pub chunks_used: usize,
}

impl Answer {
    /// Reply for a workspace with nothing to ground an answer on
    pub fn no_information() -> Self {
        Self {
            answer: NO_INFORMATION_REPLY.to_string(),
            confidence: MIN_CONFIDENCE,
            sources: Vec::new(),
            chunks_used: 0,
        }
    }
}

pub struct AnswerGenerator {
    retriever: Arc<Retriever>,
    model: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(retriever: Arc<Retriever>, model: Arc<dyn ChatModel>) -> Self {
        Self { retriever, model }
    }

    /// Answer a question from the workspace's processed documents
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer(&self, workspace_id: Uuid, question: &str) -> Result<Answer> {
        let retrieval_start = Instant::now();
        let chunks = self.retriever.retrieve(workspace_id, question).await?;
        let retrieval_secs = retrieval_start.elapsed().as_secs_f64();

        if chunks.is_empty() {
            record_chat(retrieval_secs, None, 0);
            info!("No processed chunks in workspace, skipping generation");
            return Ok(Answer::no_information());
        }

        let prompt = render_prompt(&build_context(&chunks), question);

        let generation_start = Instant::now();
        let answer = self.model.complete(&prompt).await.map_err(|e| {
            warn!(model = self.model.model_name(), error = %e, "Answer generation failed");
            e
        })?;
        let generation_secs = generation_start.elapsed().as_secs_f64();

        record_chat(retrieval_secs, Some(generation_secs), chunks.len());

        let confidence = confidence(&chunks);
        info!(
            chunks_used = chunks.len(),
            confidence,
            retrieval_ms = (retrieval_secs * 1000.0) as u64,
            generation_ms = (generation_secs * 1000.0) as u64,
            "Answer generated"
        );

        Ok(Answer {
            answer,
            confidence,
            sources: sources(&chunks),
            chunks_used: chunks.len(),
        })
    }
}

/// Mean similarity as a percentage, clamped to `[50, 100]`
pub fn confidence(chunks: &[ScoredChunk]) -> i32 {
    if chunks.is_empty() {
        return MIN_CONFIDENCE;
    }
    let mean = chunks.iter().map(|c| c.score as f64).sum::<f64>() / chunks.len() as f64;
    let percent = (mean * 100.0).round();
    if percent.is_nan() {
        return MIN_CONFIDENCE;
    }
    (percent as i32).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Distinct document names, first occurrence wins
pub fn sources(chunks: &[ScoredChunk]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for chunk in chunks {
        if !names.contains(&chunk.document_name) {
            names.push(chunk.document_name.clone());
        }
    }
    names
}
