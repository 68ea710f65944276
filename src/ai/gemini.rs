//! Gemini (Generative Language REST API) implementation of [`InferenceBackend`].
//!
//! Structured analysis uses `generateContent` with inline base64 audio,
//! `responseMimeType: application/json` and an explicit response schema.
//! The advisor uses the same endpoint with a system instruction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AiError, ChatMessage, ChatRole, InferenceBackend, StructuredRequest};
use crate::config::AiSettings;

const PROVIDER_NAME: &str = "Gemini";

/// HTTP client for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    analysis_model: String,
    advisor_model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl GeminiClient {
    /// Creates a client. A missing key is allowed; every request then fails
    /// with [`AiError::MissingApiKey`].
    ///
    /// # Errors
    /// - If the HTTP client cannot be built
    pub fn new(settings: &AiSettings, api_key: Option<String>) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| AiError::Network(format!("Failed to build HTTP client: {e}")))?;

        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("No API key configured; AI requests will fail");
        }

        Ok(Self {
            http,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            analysis_model: settings.analysis_model.clone(),
            advisor_model: settings.advisor_model.clone(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(model)
        )
    }

    async fn generate(&self, model: &str, body: &GenerateRequest) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;
        let url = self.endpoint(model);

        tracing::debug!(
            "{} API Call:\n  URL: {}\n  Method: POST\n  Headers:\n    x-goog-api-key: <redacted>\n  Contents: {} turn(s)",
            PROVIDER_NAME,
            url,
            body.contents.len()
        );

        let response = match self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let error_msg = if e.is_connect() {
                    format!("Failed to connect to the {PROVIDER_NAME} API server. Check your internet connection.")
                } else if e.is_timeout() {
                    format!("Request to {PROVIDER_NAME} timed out. The API server is not responding.")
                } else if e.is_builder() {
                    format!("Failed to build {PROVIDER_NAME} API request: {e}. This may be a configuration error.")
                } else {
                    format!("{PROVIDER_NAME} network error: {e}")
                };
                return Err(AiError::Network(error_msg));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(service_error(status.as_u16(), &error_body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(format!("Failed to parse {PROVIDER_NAME} response: {e}")))?;

        let text = extract_text(parsed)?;
        tracing::debug!(
            "{} API Response:\n  Status: Success\n  Text length: {} characters",
            PROVIDER_NAME,
            text.len()
        );
        Ok(text)
    }
}

/// Turns an error status and body into a human-readable message.
fn service_error(status: u16, body: &str) -> AiError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    let message = match status {
        400 => format!("{PROVIDER_NAME} rejected the request: {detail}"),
        401 | 403 => format!(
            "{PROVIDER_NAME} API key is invalid or lacks permission. Check GEMINI_API_KEY."
        ),
        404 => format!("{PROVIDER_NAME} model not found: {detail}"),
        429 => format!(
            "Too many requests to {PROVIDER_NAME}. You've hit the API rate limit. Please wait and try again."
        ),
        500 | 502 | 503 | 504 => {
            format!("{PROVIDER_NAME} API server is experiencing issues. Please try again later.")
        }
        _ => format!("{PROVIDER_NAME} API error (status {status}): {detail}"),
    };

    AiError::Service { status, message }
}

/// Joins the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Result<String, AiError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Malformed("response contained no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AiError::Malformed(format!(
            "response contained no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

fn text_content(role: &str, text: &str) -> Content {
    Content {
        role: Some(role.to_string()),
        parts: vec![Part {
            text: Some(text.to_string()),
            ..Part::default()
        }],
    }
}

/// Maps the transcript to alternating user/model turns. Consecutive
/// messages from the same side are merged into one turn.
fn chat_contents(history: &[ChatMessage], message: &str) -> Vec<Content> {
    let mut turns: Vec<(ChatRole, String)> = Vec::with_capacity(history.len() + 1);
    let latest = ChatMessage::user(message);

    for m in history.iter().chain(std::iter::once(&latest)) {
        match turns.last_mut() {
            Some((role, text)) if *role == m.role => {
                text.push_str("\n\n");
                text.push_str(&m.text);
            }
            _ => turns.push((m.role, m.text.clone())),
        }
    }

    turns
        .iter()
        .map(|(role, text)| {
            let role = match role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            text_content(role, text)
        })
        .collect()
}

#[async_trait::async_trait]
impl InferenceBackend for GeminiClient {
    async fn generate_structured(&self, request: StructuredRequest) -> Result<String, AiError> {
        let mut parts = Vec::with_capacity(2);
        if let Some(audio) = request.audio {
            parts.push(Part {
                inline_data: Some(InlineData {
                    mime_type: audio.mime_type,
                    data: audio.data_base64,
                }),
                ..Part::default()
            });
        }
        parts.push(Part {
            text: Some(request.instruction),
            ..Part::default()
        });

        let body = GenerateRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: request.response_schema,
            }),
        };

        self.generate(&self.analysis_model, &body).await
    }

    async fn chat(
        &self,
        persona: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AiError> {
        let body = GenerateRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: Some(persona.to_string()),
                    ..Part::default()
                }],
            }),
            contents: chat_contents(history, message),
            generation_config: None,
        };

        self.generate(&self.advisor_model, &body).await
    }
}
