//! Waveform session: binding a clip to a rendering/playback engine.
//!
//! Decoding and drawing belong to the engine. This module owns the engine's
//! lifecycle (one engine instance per load, destroyed before the next one is
//! created), the zoom level, and the tagging of engine events with the load
//! they belong to so late events from a superseded load can be ignored.

pub mod engine;
pub mod headless;
pub mod session;

pub use engine::{
    engine_event_channel, EngineError, EngineEvent, EngineEventReceiver, EngineEventSink,
    EngineFactory, LoadId, WaveformEngine, WaveformOptions,
};
pub use headless::{HeadlessEngine, HeadlessEngineFactory};
pub use session::{WaveformSession, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};
