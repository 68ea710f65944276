//! Stand-ins for the engine, the microphone and the AI service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use audiodesk::ai::{AiError, StructuredRequest};
use audiodesk::media::{CaptureError, CaptureFormat, CaptureStream};
use audiodesk::waveform::{EngineError, EngineEventSink, LoadId};
use audiodesk::{
    CaptureDevice, ChatMessage, EngineEvent, EngineFactory, InferenceBackend, SessionController,
    WaveformEngine, WaveformOptions,
};

/// What a stub engine reports when a clip is loaded.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Ready(f64),
    Error(String),
    /// Report nothing; the test delivers events itself
    Silent,
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub created: usize,
    pub destroyed: usize,
    pub loaded_urls: Vec<String>,
    pub load_ids: Vec<LoadId>,
}

impl EngineLog {
    pub fn live(&self) -> usize {
        self.created - self.destroyed
    }
}

pub struct StubEngineFactory {
    pub log: Arc<Mutex<EngineLog>>,
    outcome: Mutex<LoadOutcome>,
}

impl StubEngineFactory {
    pub fn new(outcome: LoadOutcome) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(Mutex::new(EngineLog::default())),
            outcome: Mutex::new(outcome),
        })
    }

    pub fn set_outcome(&self, outcome: LoadOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn last_load_id(&self) -> LoadId {
        *self.log.lock().unwrap().load_ids.last().unwrap()
    }
}

impl EngineFactory for StubEngineFactory {
    fn create(
        &self,
        _options: &WaveformOptions,
        events: EngineEventSink,
    ) -> Result<Box<dyn WaveformEngine>, EngineError> {
        let mut log = self.log.lock().unwrap();
        log.created += 1;
        log.load_ids.push(events.load_id());
        Ok(Box::new(StubEngine {
            events,
            outcome: self.outcome.lock().unwrap().clone(),
            log: self.log.clone(),
            duration: 0.0,
            playing: false,
            destroyed: false,
        }))
    }
}

struct StubEngine {
    events: EngineEventSink,
    outcome: LoadOutcome,
    log: Arc<Mutex<EngineLog>>,
    duration: f64,
    playing: bool,
    destroyed: bool,
}

impl WaveformEngine for StubEngine {
    fn load(&mut self, url: &str, _bytes: Arc<[u8]>) -> Result<(), EngineError> {
        self.log.lock().unwrap().loaded_urls.push(url.to_string());
        match &self.outcome {
            LoadOutcome::Ready(duration) => {
                self.duration = *duration;
                self.events.emit(EngineEvent::Ready { duration: *duration });
            }
            LoadOutcome::Error(reason) => self.events.emit(EngineEvent::Error(reason.clone())),
            LoadOutcome::Silent => {}
        }
        Ok(())
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn zoom(&mut self, _px_per_sec: u32) {}

    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn destroy(&mut self) {
        assert!(!self.destroyed, "engine destroyed twice");
        self.destroyed = true;
        self.log.lock().unwrap().destroyed += 1;
    }
}

pub const STUB_FORMAT: CaptureFormat = CaptureFormat {
    sample_rate: 8000,
    channels: 1,
};

/// Microphone that either grants access with canned chunks or refuses.
/// How the stub device answers an open request.
#[derive(Clone, Copy, PartialEq, Eq)]
enum DeviceAnswer {
    Grant,
    Deny,
    /// The user never answers the prompt
    Never,
}

pub struct StubCaptureDevice {
    answer: DeviceAnswer,
    chunks: Vec<Vec<i16>>,
    pub live_tracks: Arc<AtomicUsize>,
    pub opens: AtomicUsize,
}

impl StubCaptureDevice {
    fn answering(answer: DeviceAnswer, chunks: Vec<Vec<i16>>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            chunks,
            live_tracks: Arc::new(AtomicUsize::new(0)),
            opens: AtomicUsize::new(0),
        })
    }

    pub fn granting(chunks: Vec<Vec<i16>>) -> Arc<Self> {
        Self::answering(DeviceAnswer::Grant, chunks)
    }

    pub fn denying() -> Arc<Self> {
        Self::answering(DeviceAnswer::Deny, Vec::new())
    }

    pub fn unanswered() -> Arc<Self> {
        Self::answering(DeviceAnswer::Never, Vec::new())
    }

    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for StubCaptureDevice {
    async fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            DeviceAnswer::Grant => {}
            DeviceAnswer::Deny => {
                return Err(CaptureError::PermissionDenied("access denied by user".to_string()))
            }
            DeviceAnswer::Never => std::future::pending::<()>().await,
        }
        self.live_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubStream {
            pending: self.chunks.iter().cloned().collect(),
            live_tracks: self.live_tracks.clone(),
            stopped: false,
        }))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

struct StubStream {
    pending: VecDeque<Vec<i16>>,
    live_tracks: Arc<AtomicUsize>,
    stopped: bool,
}

impl CaptureStream for StubStream {
    fn format(&self) -> CaptureFormat {
        STUB_FORMAT
    }

    fn drain_chunks(&mut self) -> Vec<Vec<i16>> {
        self.pending.drain(..).collect()
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live_tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn active_tracks(&self) -> usize {
        usize::from(!self.stopped)
    }
}

/// AI service answering from queued responses.
///
/// Chat calls without a queued response echo the message back.
#[derive(Default)]
pub struct ScriptedBackend {
    structured: Mutex<VecDeque<Result<String, AiError>>>,
    chat: Mutex<VecDeque<Result<String, AiError>>>,
    gated: AtomicBool,
    gate: tokio::sync::Notify,
    pub structured_calls: AtomicUsize,
    pub chat_histories: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_structured(&self, response: Result<String, AiError>) {
        self.structured.lock().unwrap().push_back(response);
    }

    pub fn push_chat(&self, response: Result<String, AiError>) {
        self.chat.lock().unwrap().push_back(response);
    }

    /// Holds structured calls until [`ScriptedBackend::release`].
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate_structured(&self, _request: StructuredRequest) -> Result<String, AiError> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::Network("no scripted response".to_string())))
    }

    async fn chat(
        &self,
        _persona: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AiError> {
        self.chat_histories.lock().unwrap().push(history.to_vec());
        tokio::task::yield_now().await;
        self.chat
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("re: {message}")))
    }
}

pub const ANALYSIS_JSON: &str = r#"{"transcript":"Hello world","sentiment":"Neutral","enhancementSuggestions":["Reduce hiss"],"noiseLevel":"Low","audioQualityScore":82}"#;

pub struct Harness {
    pub controller: Arc<SessionController>,
    pub engines: Arc<StubEngineFactory>,
    pub microphone: Arc<StubCaptureDevice>,
    pub backend: Arc<ScriptedBackend>,
}

pub fn harness(outcome: LoadOutcome, microphone: Arc<StubCaptureDevice>) -> Harness {
    let engines = StubEngineFactory::new(outcome);
    let backend = ScriptedBackend::new();
    let controller = Arc::new(SessionController::new(
        engines.clone(),
        microphone.clone(),
        backend.clone(),
        WaveformOptions::default(),
    ));
    Harness {
        controller,
        engines,
        microphone,
        backend,
    }
}

pub fn ready_harness() -> Harness {
    harness(LoadOutcome::Ready(12.5), StubCaptureDevice::granting(vec![vec![1, 2, 3], vec![4, 5]]))
}

pub fn wav_file(name: &str, size: usize) -> audiodesk::FileInput {
    audiodesk::FileInput::new(name, vec![0u8; size], "audio/wav")
}
