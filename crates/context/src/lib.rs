//! QuickOnboard Context Engine
//!
//! Turns retrieved chunks into grounded answers:
//! - Prompt assembly from top-ranked chunks
//! - LLM integration (Gemini, OpenAI-compatible, mock)
//! - Confidence and source attribution
//! - Workspace welcome message

pub mod errors;
pub mod generator;
pub mod llm;
pub mod prompt;
pub mod welcome;

pub use errors::GenerationError;
pub use generator::{Answer, AnswerGenerator};
pub use llm::{create_chat_model, ChatModel, MockChatModel};
pub use prompt::{build_context, render_prompt, NO_INFORMATION_REPLY, RAG_PROMPT};
pub use welcome::welcome_message;
