//! Text chunking module
//!
//! Splits extracted text into overlapping chunks for embedding. Sizes and
//! offsets are measured in characters, not bytes.

use crate::errors::IngestionError;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Boundaries tried when pulling a chunk end back, highest priority first
const BOUNDARIES: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

/// How chunk boundaries are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkStrategy {
    /// Fixed stride of `chunk_size - chunk_overlap`, ends snapped to a nearby boundary
    #[default]
    Sliding,
    /// Recursive boundary splitting (paragraphs, then sentences, then words)
    Recursive,
}

impl ChunkStrategy {
    pub fn parse(value: &str) -> Result<Self, IngestionError> {
        match value {
            "sliding" => Ok(ChunkStrategy::Sliding),
            "recursive" => Ok(ChunkStrategy::Recursive),
            other => Err(IngestionError::Chunking(format!(
                "Unknown chunking strategy: {}",
                other
            ))),
        }
    }
}

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    pub strategy: ChunkStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            strategy: ChunkStrategy::Sliding,
        }
    }
}

impl ChunkingConfig {
    /// Build from the service configuration section
    pub fn from_config(
        config: &quickonboard_common::config::IngestionConfig,
    ) -> Result<Self, IngestionError> {
        let chunking = Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            strategy: ChunkStrategy::parse(&config.strategy)?,
        };
        chunking.validate()?;
        Ok(chunking)
    }

    pub fn validate(&self) -> Result<(), IngestionError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(IngestionError::Chunking(format!(
                "chunk_overlap ({}) must be smaller than a non-zero chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between consecutive chunk starts
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// A text chunk with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk in the document, contiguous from 0
    pub index: i32,
    /// Start character position in original text
    pub start_pos: usize,
    /// End character position in original text (exclusive)
    pub end_pos: usize,
}

/// Split text into chunks for embedding
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, IngestionError> {
    config.validate()?;

    let chunks = match config.strategy {
        ChunkStrategy::Sliding => chunk_sliding(text, config),
        ChunkStrategy::Recursive => chunk_recursive(text, config)?,
    };

    debug!(
        input_chars = text.chars().count(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        strategy = ?config.strategy,
        "Text chunked"
    );

    Ok(chunks)
}

/// Sliding window: chunk `k` starts at `k * stride`
fn chunk_sliding(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let total_len = chars.len();
    let stride = config.stride();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_len {
        let nominal_end = (start + config.chunk_size).min(total_len);
        let end = if nominal_end == total_len {
            total_len
        } else {
            find_boundary(&chars, start + stride, nominal_end).unwrap_or(nominal_end)
        };

        push_chunk(&mut chunks, chars[start..end].iter().collect(), start, end);

        if end == total_len {
            break;
        }
        start += stride;
    }

    chunks
}

/// Last preferred boundary whose end falls in `[lower, upper]`
fn find_boundary(chars: &[char], lower: usize, upper: usize) -> Option<usize> {
    BOUNDARIES.iter().find_map(|boundary| {
        let pattern: Vec<char> = boundary.chars().collect();
        (lower.max(pattern.len())..=upper)
            .rev()
            .find(|&end| chars[end - pattern.len()..end] == pattern[..])
    })
}

/// Recursive splitting via text-splitter, with the same capacity and overlap
fn chunk_recursive(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, IngestionError> {
    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| IngestionError::Chunking(e.to_string()))?;
    let splitter = TextSplitter::new(chunk_config);

    let mut chunks = Vec::new();
    // Track char offsets incrementally; chunk byte offsets are non-decreasing
    let mut last_byte = 0;
    let mut last_char = 0;

    for (byte_offset, chunk) in splitter.chunk_indices(text) {
        let start = last_char + text[last_byte..byte_offset].chars().count();
        last_byte = byte_offset;
        last_char = start;

        let end = start + chunk.chars().count();
        push_chunk(&mut chunks, chunk.to_string(), start, end);
    }

    Ok(chunks)
}

fn push_chunk(chunks: &mut Vec<TextChunk>, content: String, start_pos: usize, end_pos: usize) {
    if content.trim().is_empty() {
        return;
    }
    chunks.push(TextChunk {
        content,
        index: chunks.len() as i32,
        start_pos,
        end_pos,
    });
}
