//! LLM clients
//!
//! A `ChatModel` takes a fully rendered prompt and returns the answer text.
//! Providers:
//! - Gemini `generateContent`
//! - OpenAI-compatible chat completions
//! - Mock (fixed reply, counts calls)

use crate::errors::GenerationError;
use async_trait::async_trait;
use quickonboard_common::config::LlmConfig;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Trait for chat-completion providers
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for a single-turn prompt
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GenerationError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GenerationError::Api { status, body })
}

// ============================================================================
// Gemini
// ============================================================================

/// Google Generative Language API client
pub struct GeminiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiChatModel {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
        })
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request {
                message: e.to_string(),
            })?;

        let result: GenerateContentResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse {
                message: e.to_string(),
            })?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        non_empty(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI-compatible
// ============================================================================

/// Chat completions client for OpenAI and compatible servers
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    base_url: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChatModel {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request {
                message: e.to_string(),
            })?;

        let result: ChatCompletionResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse {
                message: e.to_string(),
            })?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        non_empty(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn non_empty(text: String) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Returns a fixed reply and counts how often it was asked
pub struct MockChatModel {
    reply: String,
    calls: AtomicUsize,
}

impl MockChatModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new("This is a mock answer based on the provided documentation.")
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Create a chat model based on configuration
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>, GenerationError> {
    let require_key = || {
        config
            .api_key
            .clone()
            .ok_or_else(|| GenerationError::Configuration {
                message: format!("llm.api_key is required for provider {}", config.provider),
            })
    };

    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiChatModel::new(config, require_key()?)?)),
        "openai" => Ok(Arc::new(OpenAIChatModel::new(config, require_key()?)?)),
        "mock" => Ok(Arc::new(MockChatModel::default())),
        other => Err(GenerationError::Configuration {
            message: format!("Unknown LLM provider: {}", other),
        }),
    }
}
