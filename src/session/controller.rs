use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::state::{FilterSettings, Session, SessionStatus};
use crate::ai::{self, AnalysisResult, ChatMessage, InferenceBackend, ADVISOR_ERROR_NOTICE};
use crate::media::{
    ActiveCapture, AudioMetadata, AudioResource, CaptureDevice, FileInput, ObjectUrlRegistry,
    ResourceId,
};
use crate::waveform::{
    engine_event_channel, EngineEvent, EngineEventReceiver, EngineFactory, LoadId,
    WaveformOptions, WaveformSession,
};

/// Snapshot of a capture in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureProgress {
    pub chunks: usize,
    pub samples: usize,
    pub seconds: f64,
}

/// Drives one [`Session`] through its lifecycle.
///
/// Every operation is single-flight per kind: one resource-replacing
/// operation (load or capture), one analysis, and advisor turns serialized
/// in call order. Session data is never locked across a network call.
pub struct SessionController {
    inner: Mutex<Inner>,
    engine_events: Mutex<EngineEventReceiver>,
    /// Serializes writers of the conversation transcript
    chat_lock: Mutex<()>,
    /// A device open is awaiting the user's answer
    capture_pending: AtomicBool,
    capture_device: Arc<dyn CaptureDevice>,
    backend: Arc<dyn InferenceBackend>,
}

struct Inner {
    session: Session,
    urls: ObjectUrlRegistry,
    waveform: WaveformSession,
    capture: Option<ActiveCapture>,
    /// The current load has not reported Ready/Error yet
    awaiting_engine: bool,
    analysis_ticket: u64,
}

impl SessionController {
    pub fn new(
        engines: Arc<dyn EngineFactory>,
        capture_device: Arc<dyn CaptureDevice>,
        backend: Arc<dyn InferenceBackend>,
        options: WaveformOptions,
    ) -> Self {
        let (events_tx, events_rx) = engine_event_channel();
        Self {
            inner: Mutex::new(Inner {
                session: Session::new(),
                urls: ObjectUrlRegistry::new(),
                waveform: WaveformSession::new(engines, options, events_tx),
                capture: None,
                awaiting_engine: false,
                analysis_ticket: 0,
            }),
            engine_events: Mutex::new(events_rx),
            chat_lock: Mutex::new(()),
            capture_pending: AtomicBool::new(false),
            capture_device,
            backend,
        }
    }

    /// Returns a copy of the current session.
    pub async fn snapshot(&self) -> Session {
        self.inner.lock().await.session.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.session.status()
    }

    /// Number of object URLs currently published.
    pub async fn live_object_urls(&self) -> usize {
        self.inner.lock().await.urls.live_count()
    }

    // ------------------------------------------------------------------
    // Media acquisition
    // ------------------------------------------------------------------

    /// Imports a user-selected file and binds it to a fresh engine.
    ///
    /// `None` (nothing selected) is a no-op. The session enters `Loading`
    /// until the engine reports the clip ready.
    ///
    /// # Errors
    /// - `Busy` while another load or a capture is in progress
    /// - `Unplayable` if the engine refuses the clip outright
    pub async fn import_file(&self, file: Option<FileInput>) -> Result<Option<ResourceId>, SessionError> {
        let Some(file) = file else {
            debug!("Import requested without a file; ignoring");
            return Ok(None);
        };

        let mut inner = self.inner.lock().await;
        inner.ensure_can_replace("import a file", self.capture_pending())?;

        info!("Importing {} ({} bytes, {})", file.name, file.bytes.len(), file.mime);
        let (resource, metadata) = file.into_resource(&mut inner.urls);
        inner.bind_clip(resource, metadata, SessionStatus::Loading).map(Some)
    }

    /// Requests the microphone and starts accumulating chunks.
    ///
    /// Dropping the returned future while the device is being opened cancels
    /// the request; the session stays as it was.
    ///
    /// # Errors
    /// - `Busy` while another load or a capture is in progress
    /// - `DeviceUnavailable` if access is denied; the session is left untouched
    pub async fn start_capture(&self) -> Result<(), SessionError> {
        let _pending = {
            let inner = self.inner.lock().await;
            inner.ensure_can_replace("start recording", self.capture_pending())?;
            PendingCapture::mark(&self.capture_pending)
        };

        info!("Requesting audio input ({})", self.capture_device.name());
        let opened = self.capture_device.open().await;

        let mut inner = self.inner.lock().await;
        match opened {
            Ok(stream) => {
                inner.capture = Some(ActiveCapture::new(stream));
                inner.session.set_status(SessionStatus::Recording);
                info!("Recording started");
                Ok(())
            }
            Err(e) => {
                warn!("Audio input unavailable: {}", e);
                Err(SessionError::DeviceUnavailable(e))
            }
        }
    }

    fn capture_pending(&self) -> bool {
        self.capture_pending.load(Ordering::SeqCst)
    }

    /// Pulls pending chunks into the recording and reports its size.
    pub async fn capture_progress(&self) -> Option<CaptureProgress> {
        let mut inner = self.inner.lock().await;
        let capture = inner.capture.as_mut()?;
        capture.accumulate();
        Some(CaptureProgress {
            chunks: capture.chunk_count(),
            samples: capture.sample_count(),
            seconds: capture.elapsed_audio_secs(),
        })
    }

    /// Stops the device, turns the chunks into a WAV clip and binds it.
    ///
    /// Without an active capture this is a no-op.
    ///
    /// # Errors
    /// - `Capture` if the recording cannot be encoded
    /// - `Unplayable` if the engine refuses the clip outright
    pub async fn stop_capture(&self) -> Result<Option<ResourceId>, SessionError> {
        let mut inner = self.inner.lock().await;
        let Some(capture) = inner.capture.take() else {
            debug!("Stop requested with no active recording; ignoring");
            return Ok(None);
        };

        match capture.finish() {
            Ok(clip) => {
                let (resource, metadata) = clip.into_resource(&mut inner.urls);
                inner
                    .bind_clip(resource, metadata, SessionStatus::Editing)
                    .map(Some)
            }
            Err(e) => {
                tracing::error!("Failed to finalize recording: {}", e);
                inner.session.set_status(SessionStatus::Editing);
                Err(SessionError::Capture(e))
            }
        }
    }

    /// Unbinds the clip, leaving an editing session with nothing loaded.
    ///
    /// # Errors
    /// - `Busy` while a load or a capture is in progress
    pub async fn clear_resource(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        match inner.session.status() {
            SessionStatus::Loading | SessionStatus::Recording => Err(SessionError::Busy("clear the clip")),
            SessionStatus::Idle => Ok(()),
            SessionStatus::Editing | SessionStatus::Analyzing => {
                inner.release_clip();
                inner.session.set_status(SessionStatus::Editing);
                info!("Clip cleared");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Waveform engine
    // ------------------------------------------------------------------

    /// Applies one engine event. Events from superseded loads are ignored.
    pub async fn handle_engine_event(&self, load_id: LoadId, event: EngineEvent) {
        self.inner.lock().await.apply_engine_event(load_id, event);
    }

    /// Applies every engine event queued so far. Returns how many were read.
    pub async fn pump_engine_events(&self) -> usize {
        let mut events = self.engine_events.lock().await;
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        while let Ok((load_id, event)) = events.try_recv() {
            inner.apply_engine_event(load_id, event);
            count += 1;
        }
        count
    }

    /// Waits until the current load reports Ready or Error and returns the
    /// clip duration.
    ///
    /// # Errors
    /// - `Unplayable` if the engine could not decode the clip
    /// - `NoResource` if nothing is loaded
    pub async fn wait_for_engine(&self) -> Result<f64, SessionError> {
        let mut events = self.engine_events.lock().await;
        loop {
            {
                let mut inner = self.inner.lock().await;
                while let Ok((load_id, event)) = events.try_recv() {
                    inner.apply_engine_event(load_id, event);
                }
                if !inner.awaiting_engine {
                    return match inner.session.metadata() {
                        Some(metadata) => Ok(metadata.duration),
                        None => Err(match inner.session.last_error() {
                            Some(reason) => SessionError::Unplayable(reason.to_string()),
                            None => SessionError::NoResource,
                        }),
                    };
                }
            }

            match events.recv().await {
                Some((load_id, event)) => self.inner.lock().await.apply_engine_event(load_id, event),
                None => {
                    return Err(SessionError::Unplayable(
                        "waveform engine stopped reporting".to_string(),
                    ))
                }
            }
        }
    }

    /// Toggles playback. Returns the new playing state, or `None` with
    /// nothing bound.
    pub async fn play_pause(&self) -> Option<bool> {
        self.inner.lock().await.waveform.play_pause()
    }

    pub async fn play(&self) {
        self.inner.lock().await.waveform.play();
    }

    pub async fn pause(&self) {
        self.inner.lock().await.waveform.pause();
    }

    pub async fn stop_playback(&self) {
        self.inner.lock().await.waveform.stop();
    }

    /// Sets the zoom (clamped to 1-100) and returns the applied level.
    pub async fn set_zoom(&self, level: u32) -> u32 {
        self.inner.lock().await.waveform.set_zoom(level)
    }

    pub async fn zoom(&self) -> u32 {
        self.inner.lock().await.waveform.zoom()
    }

    pub async fn current_time(&self) -> f64 {
        self.inner.lock().await.waveform.current_time()
    }

    pub async fn is_playing(&self) -> bool {
        self.inner.lock().await.waveform.is_playing()
    }

    /// Edits the filter intent; setters clamp to their domains.
    pub async fn update_filters<F>(&self, edit: F) -> FilterSettings
    where
        F: FnOnce(&mut FilterSettings),
    {
        let mut inner = self.inner.lock().await;
        edit(inner.session.filters_mut());
        *inner.session.filters()
    }

    // ------------------------------------------------------------------
    // AI
    // ------------------------------------------------------------------

    /// Sends the loaded clip for analysis.
    ///
    /// The session is `Analyzing` for the duration of the call and returns
    /// to `Editing` afterwards, success or failure. A result that arrives
    /// after the clip was replaced is discarded.
    ///
    /// # Errors
    /// - `Busy` if an analysis is already running
    /// - `NoResource` / `InvalidTransition` if there is nothing to analyze
    /// - `Analysis` if the request fails; the previous analysis is kept
    /// - `Superseded` if the clip changed during the call
    pub async fn analyze(&self) -> Result<AnalysisResult, SessionError> {
        let (ticket, resource_id, bytes, format) = {
            let mut inner = self.inner.lock().await;
            match inner.session.status() {
                SessionStatus::Editing => {}
                SessionStatus::Analyzing => return Err(SessionError::Busy("analyze")),
                status => {
                    return Err(SessionError::InvalidTransition {
                        operation: "analyze",
                        status,
                    })
                }
            }

            let resource = inner
                .session
                .resource()
                .cloned()
                .ok_or(SessionError::NoResource)?;
            let format = inner
                .session
                .metadata()
                .map(|m| m.format.clone())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            inner.analysis_ticket += 1;
            inner.session.set_status(SessionStatus::Analyzing);
            (inner.analysis_ticket, resource.id(), resource.bytes(), format)
        };

        let outcome = ai::analyze(self.backend.as_ref(), bytes, &format).await;

        let summary = {
            let mut inner = self.inner.lock().await;
            if inner.analysis_ticket == ticket && inner.session.status() == SessionStatus::Analyzing {
                inner.session.set_status(SessionStatus::Editing);
            }

            match outcome {
                Ok(result) => {
                    if !inner.session.set_analysis(resource_id, result.clone()) {
                        info!("Discarding analysis for replaced clip {}", resource_id);
                        return Err(SessionError::Superseded);
                    }
                    info!(
                        "Analysis stored: noise={}, score={}",
                        result.noise_level, result.audio_quality_score
                    );
                    (result.summary(), result)
                }
                Err(e) => {
                    warn!("Analysis failed: {}", e);
                    return Err(SessionError::Analysis(e));
                }
            }
        };

        let (text, result) = summary;
        let _transcript = self.chat_lock.lock().await;
        self.inner
            .lock()
            .await
            .session
            .push_chat(ChatMessage::assistant(text));
        Ok(result)
    }

    /// Sends one message to the mixing advisor.
    ///
    /// Appends the user message, then the reply, or a generic notice if the
    /// request failed. Concurrent calls are served in call order.
    ///
    /// Blank input is rejected before anything is appended, so it is the one
    /// case where the transcript does not grow by two entries.
    ///
    /// # Errors
    /// - `EmptyMessage` for blank input (nothing is appended)
    /// - `Advisor` if the request fails
    pub async fn advise(&self, message: &str) -> Result<String, SessionError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let _turn = self.chat_lock.lock().await;

        let history = {
            let mut inner = self.inner.lock().await;
            let history = inner.session.chat_history().to_vec();
            inner.session.push_chat(ChatMessage::user(message));
            history
        };

        let outcome = ai::advise(self.backend.as_ref(), &history, message).await;

        let mut inner = self.inner.lock().await;
        match outcome {
            Ok(reply) => {
                inner.session.push_chat(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                warn!("Advisor request failed: {}", e);
                inner.session.push_chat(ChatMessage::assistant(ADVISOR_ERROR_NOTICE));
                Err(SessionError::Advisor(e))
            }
        }
    }
}

/// Marks a device open as in flight; cleared on drop, including when the
/// awaiting future is cancelled.
struct PendingCapture<'a>(&'a AtomicBool);

impl<'a> PendingCapture<'a> {
    fn mark(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for PendingCapture<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Inner {
    fn ensure_can_replace(&self, operation: &'static str, capture_pending: bool) -> Result<(), SessionError> {
        if capture_pending || self.capture.is_some() {
            return Err(SessionError::Busy(operation));
        }
        match self.session.status() {
            SessionStatus::Loading | SessionStatus::Recording => Err(SessionError::Busy(operation)),
            SessionStatus::Idle | SessionStatus::Editing | SessionStatus::Analyzing => Ok(()),
        }
    }

    /// Releases the previous clip (engine first, then its URL) and binds the
    /// new one to a fresh engine.
    fn bind_clip(
        &mut self,
        resource: AudioResource,
        metadata: AudioMetadata,
        status: SessionStatus,
    ) -> Result<ResourceId, SessionError> {
        self.waveform.release();

        let id = resource.id();
        let url = resource.url().to_string();
        let bytes = resource.bytes();
        if let Some(previous) = self.session.bind_resource(resource, metadata) {
            self.urls.revoke(previous.url());
        }
        self.session.set_status(status);

        match self.waveform.bind(&url, bytes) {
            Ok(load_id) => {
                self.awaiting_engine = true;
                debug!("Clip {} bound as load {}", id, load_id);
                Ok(id)
            }
            Err(e) => {
                self.mark_unplayable(&e.to_string());
                Err(SessionError::Unplayable(e.to_string()))
            }
        }
    }

    fn release_clip(&mut self) {
        self.waveform.release();
        self.awaiting_engine = false;
        if let Some(previous) = self.session.clear_resource() {
            self.urls.revoke(previous.url());
        }
    }

    fn mark_unplayable(&mut self, reason: &str) {
        warn!("Clip is unplayable: {}", reason);
        self.release_clip();
        self.session.set_last_error(reason);
        self.session.set_status(SessionStatus::Idle);
    }

    fn apply_engine_event(&mut self, load_id: LoadId, event: EngineEvent) {
        if !self.waveform.is_current(load_id) {
            debug!("Ignoring {:?} from superseded load {}", event, load_id);
            return;
        }

        match event {
            EngineEvent::Ready { duration } => {
                self.awaiting_engine = false;
                if self.session.apply_duration(duration) {
                    info!("Clip ready: {:.2}s", duration);
                }
                if self.session.status() == SessionStatus::Loading {
                    self.session.set_status(SessionStatus::Editing);
                }
            }
            EngineEvent::Error(reason) => {
                self.awaiting_engine = false;
                match self.session.status() {
                    SessionStatus::Loading | SessionStatus::Editing | SessionStatus::Analyzing => {
                        self.mark_unplayable(&reason)
                    }
                    // The capture owns the status; only the clip goes
                    SessionStatus::Recording => {
                        warn!("Clip is unplayable: {}", reason);
                        self.release_clip();
                        self.session.set_last_error(reason);
                    }
                    SessionStatus::Idle => warn!("Engine error while idle: {}", reason),
                }
            }
            EngineEvent::Play | EngineEvent::Pause | EngineEvent::Finish => {
                debug!("Transport event: {:?}", event);
            }
        }
    }
}
