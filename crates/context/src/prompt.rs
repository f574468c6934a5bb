//! Prompt assembly

use quickonboard_search::ScoredChunk;

/// Reply used when nothing in the workspace can ground an answer
pub const NO_INFORMATION_REPLY: &str =
    "I don't have that information in the current documentation.";

/// Instruction template; `{context}` and `{question}` are substituted
pub const RAG_PROMPT: &str = r#"You are a helpful AI assistant for company onboarding. Answer questions based on the provided documentation.

RULES:
1. Answer questions directly and concisely using ONLY the provided context
2. If the answer is not in the context, say "I don't have that information in the current documentation."
3. Be professional and helpful, but avoid repetitive greetings
4. When citing information, mention the source document in parentheses
5. Keep responses focused and to the point

Context from company documents:
{context}

Question: {question}

Answer:"#;

/// Label each chunk with its document and join them with separators
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("[Document: {}]\n{}\n", chunk.document_name, chunk.content))
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

pub fn render_prompt(context: &str, question: &str) -> String {
    // Substitute the question first so context text containing the
    // placeholder is left untouched
    RAG_PROMPT
        .replacen("{question}", question, 1)
        .replacen("{context}", context, 1)
}
