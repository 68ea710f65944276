//! Structured transcription and quality analysis of one clip.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::{AiError, InferenceBackend, InlineAudio, StructuredRequest};

/// Instruction sent alongside the audio.
pub const ANALYSIS_INSTRUCTION: &str = "Analyze this audio clip. Transcribe any speech (leave the transcript empty if there is none), \
describe the overall sentiment or mood, classify the background noise level as Low, Medium or High, \
rate the overall audio quality from 0 to 100, and give exactly 3 short, practical enhancement suggestions \
for improving the mix.";

/// Background noise classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

impl NoiseLevel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

/// What the service reports about a clip. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Speech transcript; may be empty
    pub transcript: String,
    pub sentiment: String,
    pub enhancement_suggestions: Vec<String>,
    pub noise_level: NoiseLevel,
    /// 0-100 inclusive
    pub audio_quality_score: f64,
}

impl AnalysisResult {
    /// Chat line announcing a finished analysis.
    pub fn summary(&self) -> String {
        format!(
            "Analysis complete. Noise level: {}. Quality score: {}/100.",
            self.noise_level, self.audio_quality_score
        )
    }
}

/// JSON schema the service must answer with.
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "transcript": { "type": "STRING" },
            "sentiment": { "type": "STRING" },
            "enhancementSuggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Three practical suggestions"
            },
            "noiseLevel": { "type": "STRING", "enum": ["Low", "Medium", "High"] },
            "audioQualityScore": {
                "type": "NUMBER",
                "description": "Overall quality from 0 to 100"
            }
        },
        "required": [
            "transcript",
            "sentiment",
            "enhancementSuggestions",
            "noiseLevel",
            "audioQualityScore"
        ]
    })
}

/// Encodes the clip as base64 on the blocking pool.
///
/// # Errors
/// - If the blocking task is cancelled or panics
pub async fn encode_base64(bytes: Arc<[u8]>) -> Result<String, AiError> {
    tokio::task::spawn_blocking(move || STANDARD.encode(&bytes))
        .await
        .map_err(|e| AiError::Encoding(e.to_string()))
}

/// Parses the service's JSON text into an [`AnalysisResult`].
///
/// # Errors
/// - `Malformed` if the text is not JSON
/// - `Contract` if a required field is missing or out of range
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AiError> {
    let result: AnalysisResult = serde_json::from_str(text.trim()).map_err(|e| {
        if e.is_data() {
            AiError::Contract(e.to_string())
        } else {
            AiError::Malformed(e.to_string())
        }
    })?;

    if !result.audio_quality_score.is_finite()
        || !(0.0..=100.0).contains(&result.audio_quality_score)
    {
        return Err(AiError::Contract(format!(
            "audioQualityScore {} is outside 0-100",
            result.audio_quality_score
        )));
    }

    if result.enhancement_suggestions.len() != 3 {
        tracing::debug!(
            "Service returned {} enhancement suggestions (3 requested)",
            result.enhancement_suggestions.len()
        );
    }

    Ok(result)
}

/// Sends the clip for analysis and returns the typed result.
///
/// # Errors
/// - If base64 encoding fails
/// - If the request fails (network, API error)
/// - If the response is not valid analysis JSON
pub async fn analyze(
    backend: &dyn InferenceBackend,
    bytes: Arc<[u8]>,
    format: &str,
) -> Result<AnalysisResult, AiError> {
    let size = bytes.len();
    let data_base64 = encode_base64(bytes).await?;

    tracing::info!("Requesting analysis ({} bytes, {})", size, format);

    let request = StructuredRequest {
        instruction: ANALYSIS_INSTRUCTION.to_string(),
        audio: Some(InlineAudio {
            mime_type: format.to_string(),
            data_base64,
        }),
        response_schema: response_schema(),
    };

    let text = backend.generate_structured(request).await?;
    let result = parse_analysis(&text)?;

    tracing::debug!(
        "Analysis parsed: noise={}, score={}, transcript length={}",
        result.noise_level,
        result.audio_quality_score,
        result.transcript.len()
    );

    Ok(result)
}
