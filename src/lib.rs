//! audiodesk: an audio workspace built around a session lifecycle controller.
//!
//! A clip is imported from disk or captured from the microphone, bound to a
//! waveform engine for playback, and handed to a remote generative-AI service
//! for transcription/quality analysis and conversational mixing advice.

pub mod ai;
pub mod app;
pub mod commands;
pub mod config;
pub mod history;
pub mod logging;
pub mod media;
pub mod session;
pub mod waveform;

pub use ai::{AnalysisResult, ChatMessage, ChatRole, InferenceBackend, NoiseLevel};
pub use media::{AudioMetadata, AudioResource, CaptureDevice, FileInput};
pub use session::{FilterSettings, Session, SessionController, SessionError, SessionStatus};
pub use waveform::{EngineEvent, EngineFactory, WaveformEngine, WaveformOptions};
