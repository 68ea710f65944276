//! Built-in engine that decodes WAV headers and tracks transport against a
//! monotonic clock. It renders nothing and produces no sound.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

use super::engine::{
    EngineError, EngineEvent, EngineEventSink, EngineFactory, WaveformEngine, WaveformOptions,
};

/// Creates [`HeadlessEngine`] instances.
#[derive(Debug, Default, Clone)]
pub struct HeadlessEngineFactory;

impl EngineFactory for HeadlessEngineFactory {
    fn create(
        &self,
        options: &WaveformOptions,
        events: EngineEventSink,
    ) -> Result<Box<dyn WaveformEngine>, EngineError> {
        tracing::debug!(
            "Creating headless engine for load {} (container={}, height={})",
            events.load_id(),
            options.container,
            options.height
        );
        Ok(Box::new(HeadlessEngine::new(events, options.min_px_per_sec)))
    }
}

pub struct HeadlessEngine {
    events: EngineEventSink,
    duration: f64,
    /// Position accumulated before the current play run
    offset: f64,
    playing_since: Option<Instant>,
    px_per_sec: u32,
    finish_timer: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl HeadlessEngine {
    pub fn new(events: EngineEventSink, px_per_sec: u32) -> Self {
        Self {
            events,
            duration: 0.0,
            offset: 0.0,
            playing_since: None,
            px_per_sec,
            finish_timer: None,
            destroyed: false,
        }
    }

    pub fn px_per_sec(&self) -> u32 {
        self.px_per_sec
    }

    fn position(&self) -> f64 {
        let running = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (self.offset + running).min(self.duration)
    }

    fn cancel_finish_timer(&mut self) {
        if let Some(timer) = self.finish_timer.take() {
            timer.abort();
        }
    }

    fn schedule_finish(&mut self) {
        let remaining = (self.duration - self.offset).max(0.0);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let events = self.events.clone();
        self.finish_timer = Some(runtime.spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs_f64(remaining)).await;
            events.emit(EngineEvent::Finish);
        }));
    }
}

/// Reads the duration in seconds from a WAV header.
pub fn wav_duration(bytes: &[u8]) -> Result<f64, String> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err("sample rate is zero".to_string());
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

impl WaveformEngine for HeadlessEngine {
    fn load(&mut self, url: &str, bytes: Arc<[u8]>) -> Result<(), EngineError> {
        if self.destroyed {
            return Err(EngineError::Load("engine was destroyed".to_string()));
        }

        tracing::debug!("Headless engine decoding {} ({} bytes)", url, bytes.len());
        match wav_duration(&bytes) {
            Ok(duration) => {
                self.duration = duration;
                self.events.emit(EngineEvent::Ready { duration });
            }
            Err(e) => {
                tracing::warn!("Headless engine cannot decode {}: {}", url, e);
                self.events.emit(EngineEvent::Error(format!("unsupported or malformed audio: {e}")));
            }
        }
        Ok(())
    }

    fn play(&mut self) {
        if self.destroyed {
            return;
        }
        if self.playing_since.is_some() {
            if self.position() < self.duration {
                return;
            }
            // Ran off the end without a pause; rewind
            self.playing_since = None;
            self.cancel_finish_timer();
            self.offset = self.duration;
        }
        if self.offset >= self.duration {
            self.offset = 0.0;
        }
        self.playing_since = Some(Instant::now());
        self.schedule_finish();
        self.events.emit(EngineEvent::Play);
    }

    fn pause(&mut self) {
        if self.playing_since.is_none() {
            return;
        }
        self.offset = self.position();
        self.playing_since = None;
        self.cancel_finish_timer();
        self.events.emit(EngineEvent::Pause);
    }

    fn stop(&mut self) {
        let was_playing = self.is_playing();
        self.playing_since = None;
        self.offset = 0.0;
        self.cancel_finish_timer();
        if was_playing {
            self.events.emit(EngineEvent::Pause);
        }
    }

    fn zoom(&mut self, px_per_sec: u32) {
        self.px_per_sec = px_per_sec;
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.position()
    }

    fn is_playing(&self) -> bool {
        self.playing_since.is_some() && self.position() < self.duration
    }

    fn destroy(&mut self) {
        self.cancel_finish_timer();
        self.playing_since = None;
        self.destroyed = true;
    }
}

impl Drop for HeadlessEngine {
    fn drop(&mut self) {
        self.cancel_finish_timer();
    }
}
