//! The capability interface every waveform engine satisfies.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Sequence number of one bind of a clip to an engine.
pub type LoadId = u64;

/// Events an engine reports back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Decoding finished; total duration in seconds is known
    Ready { duration: f64 },
    Play,
    Pause,
    /// Playback reached the end of the clip
    Finish,
    /// The clip could not be decoded
    Error(String),
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("waveform engine could not be created: {0}")]
    Create(String),
    #[error("waveform engine rejected the clip: {0}")]
    Load(String),
}

/// Sender half handed to each engine, pre-tagged with its load id.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    load_id: LoadId,
    tx: mpsc::UnboundedSender<(LoadId, EngineEvent)>,
}

/// Receiver half drained by the controller.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<(LoadId, EngineEvent)>;

/// Creates the channel engines report through.
pub fn engine_event_channel() -> (mpsc::UnboundedSender<(LoadId, EngineEvent)>, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

impl EngineEventSink {
    pub fn new(load_id: LoadId, tx: mpsc::UnboundedSender<(LoadId, EngineEvent)>) -> Self {
        Self { load_id, tx }
    }

    pub fn load_id(&self) -> LoadId {
        self.load_id
    }

    pub fn emit(&self, event: EngineEvent) {
        if self.tx.send((self.load_id, event)).is_err() {
            tracing::debug!("Engine event dropped: controller is gone");
        }
    }
}

/// Rendering/playback engine bound to one clip.
pub trait WaveformEngine: Send {
    /// Starts decoding the clip published at `url`.
    ///
    /// Completion is reported through the event sink as `Ready` or `Error`.
    fn load(&mut self, url: &str, bytes: Arc<[u8]>) -> Result<(), EngineError>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Stops playback and rewinds to the start.
    fn stop(&mut self);

    /// Sets the zoom in pixels per second of audio.
    fn zoom(&mut self, px_per_sec: u32);

    /// Total duration in seconds (0 until decoded)
    fn duration(&self) -> f64;

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// Releases everything the engine holds. Called exactly once.
    fn destroy(&mut self);
}

/// Builds a fresh engine for every load.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        options: &WaveformOptions,
        events: EngineEventSink,
    ) -> Result<Box<dyn WaveformEngine>, EngineError>;
}

/// Engine configuration: where to render and how it looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformOptions {
    /// Render target identifier
    pub container: String,
    pub wave_color: String,
    pub progress_color: String,
    pub cursor_color: String,
    pub cursor_width: u32,
    pub bar_width: u32,
    pub bar_gap: u32,
    pub bar_radius: u32,
    /// Height in pixels
    pub height: u32,
    /// Initial zoom in pixels per second (1-100)
    pub min_px_per_sec: u32,
    /// Enable the region-selection plugin
    pub regions: bool,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            container: "#waveform".to_string(),
            wave_color: "#4f46e5".to_string(),
            progress_color: "#818cf8".to_string(),
            cursor_color: "#c7d2fe".to_string(),
            cursor_width: 2,
            bar_width: 2,
            bar_gap: 1,
            bar_radius: 2,
            height: 128,
            min_px_per_sec: super::session::DEFAULT_ZOOM,
            regions: true,
        }
    }
}
