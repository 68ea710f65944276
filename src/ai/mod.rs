//! Generative-AI gateway: structured audio analysis and the mixing advisor.
//!
//! Both features talk to a remote service through the [`InferenceBackend`]
//! trait. [`GeminiClient`] is the production implementation; tests plug in
//! their own backends.

pub mod advisor;
pub mod analysis;
pub mod gemini;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use advisor::{advise, ADVISOR_ERROR_NOTICE, ADVISOR_PERSONA};
pub use analysis::{analyze, parse_analysis, AnalysisResult, NoiseLevel};
pub use gemini::GeminiClient;

/// Failures of a single AI request. None of them are retried.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    #[error("no API key configured; set GEMINI_API_KEY")]
    MissingApiKey,

    /// Connection failures, timeouts, request building errors
    #[error("{0}")]
    Network(String),

    /// Non-2xx response, already turned into a human-readable message
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The response was not the JSON we asked for
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The JSON parsed but broke the requested schema
    #[error("response violates the analysis schema: {0}")]
    Contract(String),

    #[error("failed to encode audio: {0}")]
    Encoding(String),
}

/// Who said a line of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One line of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Audio attached inline to a request.
#[derive(Debug, Clone)]
pub struct InlineAudio {
    pub mime_type: String,
    pub data_base64: String,
}

/// A request whose answer must be JSON matching `response_schema`.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub instruction: String,
    pub audio: Option<InlineAudio>,
    pub response_schema: serde_json::Value,
}

/// Remote generative service.
#[async_trait::async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Returns the raw JSON text of a structured-output call.
    async fn generate_structured(&self, request: StructuredRequest) -> Result<String, AiError>;

    /// Sends one conversational turn and returns the text reply.
    async fn chat(
        &self,
        persona: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AiError>;
}
