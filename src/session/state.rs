//! Session data: lifecycle status, the loaded clip, filter intent and the
//! conversation transcript.

use serde::{Deserialize, Serialize};

use crate::ai::{AnalysisResult, ChatMessage};
use crate::media::{AudioMetadata, AudioResource, ResourceId};

/// Lifecycle status. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Editing,
    Analyzing,
    Recording,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Editing => write!(f, "editing"),
            Self::Analyzing => write!(f, "analyzing"),
            Self::Recording => write!(f, "recording"),
        }
    }
}

/// Filter parameters as the user set them. Never applied to samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    /// Linear gain, 0.0-2.0
    pub gain: f32,
    /// Low-pass cutoff in Hz, 1000-20000
    pub low_pass: u32,
    /// High-pass cutoff in Hz, 20-500
    pub high_pass: u32,
    /// Compression amount, 0.0-1.0
    pub compression: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            gain: 1.0,
            low_pass: 20000,
            high_pass: 20,
            compression: 0.0,
        }
    }
}

impl FilterSettings {
    pub const GAIN_RANGE: (f32, f32) = (0.0, 2.0);
    pub const LOW_PASS_RANGE: (u32, u32) = (1000, 20000);
    pub const HIGH_PASS_RANGE: (u32, u32) = (20, 500);
    pub const COMPRESSION_RANGE: (f32, f32) = (0.0, 1.0);

    pub fn set_gain(&mut self, gain: f32) -> f32 {
        self.gain = clamp_f32(gain, Self::GAIN_RANGE, self.gain);
        self.gain
    }

    pub fn set_low_pass(&mut self, hz: u32) -> u32 {
        self.low_pass = hz.clamp(Self::LOW_PASS_RANGE.0, Self::LOW_PASS_RANGE.1);
        self.low_pass
    }

    pub fn set_high_pass(&mut self, hz: u32) -> u32 {
        self.high_pass = hz.clamp(Self::HIGH_PASS_RANGE.0, Self::HIGH_PASS_RANGE.1);
        self.high_pass
    }

    pub fn set_compression(&mut self, amount: f32) -> f32 {
        self.compression = clamp_f32(amount, Self::COMPRESSION_RANGE, self.compression);
        self.compression
    }
}

// NaN keeps the previous value
fn clamp_f32(value: f32, (min, max): (f32, f32), previous: f32) -> f32 {
    if value.is_nan() {
        previous
    } else {
        value.clamp(min, max)
    }
}

/// The single mutable record of application state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    status: SessionStatus,
    resource: Option<AudioResource>,
    metadata: Option<AudioMetadata>,
    analysis: Option<AnalysisResult>,
    analyzed_resource: Option<ResourceId>,
    duration_applied: bool,
    filters: FilterSettings,
    chat_history: Vec<ChatMessage>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn resource(&self) -> Option<&AudioResource> {
        self.resource.as_ref()
    }

    pub fn resource_id(&self) -> Option<ResourceId> {
        self.resource.as_ref().map(AudioResource::id)
    }

    pub fn metadata(&self) -> Option<&AudioMetadata> {
        self.metadata.as_ref()
    }

    /// The last analysis, if it belongs to the bound clip.
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match (self.analyzed_resource, self.resource_id()) {
            (Some(analyzed), Some(current)) if analyzed == current => self.analysis.as_ref(),
            _ => None,
        }
    }

    pub fn filters(&self) -> &FilterSettings {
        &self.filters
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    /// Description of the last failure that changed the session (e.g. an
    /// unplayable clip).
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            tracing::debug!("Session status: {} -> {}", self.status, status);
            self.status = status;
        }
    }

    /// Binds a new clip. The previous analysis is cleared and the previous
    /// resource is returned so its URL can be revoked.
    pub(crate) fn bind_resource(
        &mut self,
        resource: AudioResource,
        metadata: AudioMetadata,
    ) -> Option<AudioResource> {
        let previous = self.resource.replace(resource);
        self.metadata = Some(metadata);
        self.analysis = None;
        self.analyzed_resource = None;
        self.duration_applied = false;
        self.last_error = None;
        previous
    }

    /// Unbinds the clip and everything derived from it.
    pub(crate) fn clear_resource(&mut self) -> Option<AudioResource> {
        self.metadata = None;
        self.analysis = None;
        self.analyzed_resource = None;
        self.duration_applied = false;
        self.resource.take()
    }

    /// Applies the engine-reported duration. Only the first report per clip
    /// is taken.
    pub(crate) fn apply_duration(&mut self, duration: f64) -> bool {
        if self.duration_applied {
            return false;
        }
        match self.metadata.as_mut() {
            Some(metadata) => {
                metadata.duration = duration.max(0.0);
                self.duration_applied = true;
                true
            }
            None => false,
        }
    }

    /// Stores an analysis result if it belongs to the bound clip.
    pub(crate) fn set_analysis(&mut self, resource_id: ResourceId, result: AnalysisResult) -> bool {
        if self.resource_id() != Some(resource_id) {
            return false;
        }
        self.analysis = Some(result);
        self.analyzed_resource = Some(resource_id);
        true
    }

    pub(crate) fn push_chat(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
    }

    pub(crate) fn filters_mut(&mut self) -> &mut FilterSettings {
        &mut self.filters
    }

    pub(crate) fn set_last_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}
