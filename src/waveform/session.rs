//! Engine lifecycle, transport and zoom for the currently bound clip.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::engine::{
    EngineError, EngineEvent, EngineEventSink, EngineFactory, LoadId, WaveformEngine,
    WaveformOptions,
};

pub const MIN_ZOOM: u32 = 1;
pub const MAX_ZOOM: u32 = 100;
pub const DEFAULT_ZOOM: u32 = 10;

/// Owns at most one engine instance at a time.
pub struct WaveformSession {
    factory: Arc<dyn EngineFactory>,
    options: WaveformOptions,
    events: mpsc::UnboundedSender<(LoadId, EngineEvent)>,
    engine: Option<Box<dyn WaveformEngine>>,
    current_load: Option<LoadId>,
    next_load: LoadId,
    zoom: u32,
}

impl WaveformSession {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        options: WaveformOptions,
        events: mpsc::UnboundedSender<(LoadId, EngineEvent)>,
    ) -> Self {
        let zoom = options.min_px_per_sec.clamp(MIN_ZOOM, MAX_ZOOM);
        Self {
            factory,
            options,
            events,
            engine: None,
            current_load: None,
            next_load: 1,
            zoom,
        }
    }

    /// Destroys the previous engine (if any), creates a new one and starts
    /// loading the clip into it.
    ///
    /// # Errors
    /// - If the factory cannot create an engine
    /// - If the engine rejects the clip outright
    pub fn bind(&mut self, url: &str, bytes: Arc<[u8]>) -> Result<LoadId, EngineError> {
        self.release();

        let load_id = self.next_load;
        self.next_load += 1;

        let mut options = self.options.clone();
        options.min_px_per_sec = self.zoom;

        let sink = EngineEventSink::new(load_id, self.events.clone());
        let mut engine = self.factory.create(&options, sink)?;
        // Marked current before load: engines may report synchronously
        self.current_load = Some(load_id);

        if let Err(e) = engine.load(url, bytes) {
            engine.destroy();
            self.current_load = None;
            return Err(e);
        }

        tracing::debug!("Clip {} bound to engine (load {})", url, load_id);
        self.engine = Some(engine);
        Ok(load_id)
    }

    /// Destroys the bound engine, if any.
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
            tracing::debug!("Engine for load {:?} destroyed", self.current_load);
        }
        self.current_load = None;
    }

    pub fn is_current(&self, load_id: LoadId) -> bool {
        self.current_load == Some(load_id)
    }

    /// Toggles playback based on the engine's playing state.
    /// Returns the playing state after the toggle, or `None` without an engine.
    pub fn play_pause(&mut self) -> Option<bool> {
        let engine = self.engine.as_mut()?;
        if engine.is_playing() {
            engine.pause();
            Some(false)
        } else {
            engine.play();
            Some(true)
        }
    }

    pub fn play(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
        }
    }

    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
    }

    /// Clamps the level to 1..=100 and passes it to the engine.
    pub fn set_zoom(&mut self, level: u32) -> u32 {
        self.zoom = level.clamp(MIN_ZOOM, MAX_ZOOM);
        if let Some(engine) = self.engine.as_mut() {
            engine.zoom(self.zoom);
        }
        self.zoom
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn is_playing(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.is_playing())
    }

    pub fn current_time(&self) -> f64 {
        self.engine.as_ref().map(|e| e.current_time()).unwrap_or(0.0)
    }
}

impl Drop for WaveformSession {
    fn drop(&mut self) {
        self.release();
    }
}
