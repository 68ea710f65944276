mod common;

use std::sync::atomic::Ordering;

use audiodesk::ai::{AiError, ADVISOR_ERROR_NOTICE};
use audiodesk::{ChatMessage, ChatRole, EngineEvent, NoiseLevel, SessionError, SessionStatus};
use common::{harness, ready_harness, wav_file, LoadOutcome, StubCaptureDevice, ANALYSIS_JSON};

async fn wait_for_status(h: &common::Harness, status: SessionStatus) {
    while h.controller.status().await != status {
        tokio::task::yield_now().await;
    }
}

async fn loaded_harness() -> common::Harness {
    let h = ready_harness();
    h.controller.import_file(Some(wav_file("track.wav", 1024))).await.unwrap();
    h.controller.wait_for_engine().await.unwrap();
    h
}

#[tokio::test]
async fn test_import_loads_then_edits() {
    let h = ready_harness();

    let id = h
        .controller
        .import_file(Some(wav_file("track.wav", 5_000_000)))
        .await
        .unwrap()
        .unwrap();

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Loading);
    assert_eq!(session.resource_id(), Some(id));
    let metadata = session.metadata().unwrap();
    assert_eq!(metadata.name, "track.wav");
    assert_eq!(metadata.size, 5_000_000);
    assert_eq!(metadata.format, "audio/wav");
    assert_eq!(metadata.duration, 0.0);

    assert_eq!(h.controller.pump_engine_events().await, 1);

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Editing);
    assert_eq!(session.metadata().unwrap().duration, 12.5);
    assert!(session.analysis().is_none());
}

#[tokio::test]
async fn test_import_without_file_is_noop() {
    let h = ready_harness();
    assert_eq!(h.controller.import_file(None).await.unwrap(), None);
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
    assert_eq!(h.engines.log.lock().unwrap().created, 0);
}

#[tokio::test]
async fn test_rebinding_destroys_previous_engine_and_url() {
    let h = loaded_harness().await;
    h.controller.import_file(Some(wav_file("second.wav", 64))).await.unwrap();
    h.controller.wait_for_engine().await.unwrap();

    {
        let log = h.engines.log.lock().unwrap();
        assert_eq!(log.created, 2);
        assert_eq!(log.destroyed, 1);
        assert_eq!(log.live(), 1);
        assert_ne!(log.loaded_urls[0], log.loaded_urls[1]);
    }
    assert_eq!(h.controller.live_object_urls().await, 1);
    assert_eq!(h.controller.snapshot().await.metadata().unwrap().name, "second.wav");
}

#[tokio::test]
async fn test_unplayable_clip_returns_to_idle() {
    let h = harness(
        LoadOutcome::Error("unsupported codec".to_string()),
        StubCaptureDevice::granting(Vec::new()),
    );
    h.controller.import_file(Some(wav_file("broken.ogg", 10))).await.unwrap();

    let err = h.controller.wait_for_engine().await.unwrap_err();
    assert!(matches!(err, SessionError::Unplayable(ref reason) if reason.contains("unsupported codec")));

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.resource().is_none());
    assert!(session.last_error().is_some());
    assert_eq!(h.controller.live_object_urls().await, 0);
    assert_eq!(h.engines.log.lock().unwrap().live(), 0);
}

#[tokio::test]
async fn test_events_from_superseded_load_are_ignored() {
    let h = harness(LoadOutcome::Silent, StubCaptureDevice::granting(Vec::new()));
    h.controller.import_file(Some(wav_file("a.wav", 10))).await.unwrap();
    let first = h.engines.last_load_id();
    h.controller.handle_engine_event(first, EngineEvent::Ready { duration: 4.0 }).await;
    assert_eq!(h.controller.status().await, SessionStatus::Editing);

    h.controller.import_file(Some(wav_file("b.wav", 10))).await.unwrap();
    let second = h.engines.last_load_id();
    assert_ne!(first, second);

    h.controller.handle_engine_event(first, EngineEvent::Ready { duration: 99.0 }).await;
    h.controller.handle_engine_event(first, EngineEvent::Error("late".to_string())).await;
    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Loading);
    assert_eq!(session.metadata().unwrap().name, "b.wav");
    assert_eq!(session.metadata().unwrap().duration, 0.0);
    assert!(session.last_error().is_none());

    h.controller.handle_engine_event(second, EngineEvent::Ready { duration: 3.0 }).await;
    h.controller.handle_engine_event(second, EngineEvent::Ready { duration: 7.0 }).await;
    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Editing);
    assert_eq!(session.metadata().unwrap().duration, 3.0);
}

#[tokio::test]
async fn test_loading_blocks_other_replacements() {
    let h = harness(LoadOutcome::Silent, StubCaptureDevice::granting(Vec::new()));
    h.controller.import_file(Some(wav_file("a.wav", 10))).await.unwrap();

    let err = h.controller.import_file(Some(wav_file("b.wav", 10))).await.unwrap_err();
    assert!(matches!(err, SessionError::Busy(_)));
    assert!(matches!(h.controller.start_capture().await, Err(SessionError::Busy(_))));
    assert!(matches!(h.controller.clear_resource().await, Err(SessionError::Busy(_))));
    assert_eq!(h.engines.log.lock().unwrap().created, 1);
}

#[tokio::test]
async fn test_capture_denied_leaves_session_unchanged() {
    let h = harness(LoadOutcome::Ready(1.0), StubCaptureDevice::denying());

    let err = h.controller.start_capture().await.unwrap_err();
    assert!(matches!(err, SessionError::DeviceUnavailable(_)));

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.resource().is_none());
    assert_eq!(h.microphone.live_tracks(), 0);
    assert!(h.controller.capture_progress().await.is_none());
}

#[tokio::test]
async fn test_abandoned_capture_request_does_not_block_session() {
    let h = harness(LoadOutcome::Ready(1.0), StubCaptureDevice::unanswered());

    let waited = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        h.controller.start_capture(),
    )
    .await;
    assert!(waited.is_err());
    assert_eq!(h.microphone.opens.load(Ordering::SeqCst), 1);

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.resource().is_none());

    h.controller.import_file(Some(wav_file("a.wav", 10))).await.unwrap();
    h.controller.wait_for_engine().await.unwrap();
    assert_eq!(h.controller.status().await, SessionStatus::Editing);

    let retry = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        h.controller.start_capture(),
    )
    .await;
    assert!(retry.is_err());
    assert_eq!(h.microphone.opens.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_capture_denied_keeps_loaded_clip() {
    let h = harness(LoadOutcome::Ready(1.0), StubCaptureDevice::denying());
    h.controller.import_file(Some(wav_file("keep.wav", 10))).await.unwrap();
    h.controller.wait_for_engine().await.unwrap();

    assert!(h.controller.start_capture().await.is_err());

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Editing);
    assert_eq!(session.metadata().unwrap().name, "keep.wav");
}

#[tokio::test]
async fn test_capture_produces_wav_clip_and_releases_device() {
    let h = harness(
        LoadOutcome::Ready(0.5),
        StubCaptureDevice::granting(vec![vec![1, 2, 3], vec![4, 5]]),
    );

    h.controller.start_capture().await.unwrap();
    assert_eq!(h.controller.status().await, SessionStatus::Recording);
    assert_eq!(h.microphone.live_tracks(), 1);

    let progress = h.controller.capture_progress().await.unwrap();
    assert_eq!(progress.chunks, 2);
    assert_eq!(progress.samples, 5);

    assert!(matches!(
        h.controller.import_file(Some(wav_file("x.wav", 1))).await,
        Err(SessionError::Busy(_))
    ));
    assert!(matches!(h.controller.clear_resource().await, Err(SessionError::Busy(_))));

    let id = h.controller.stop_capture().await.unwrap().unwrap();
    assert_eq!(h.microphone.live_tracks(), 0);
    assert_eq!(h.controller.status().await, SessionStatus::Editing);
    assert_eq!(h.controller.wait_for_engine().await.unwrap(), 0.5);

    let session = h.controller.snapshot().await;
    let resource = session.resource().unwrap();
    assert_eq!(resource.id(), id);
    let metadata = session.metadata().unwrap();
    assert_eq!(metadata.format, "audio/wav");
    assert!(metadata.name.starts_with("recording-"));

    let bytes = resource.bytes();
    let mut reader = hound::WavReader::new(std::io::Cursor::new(&bytes[..])).unwrap();
    let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_stop_without_capture_is_noop() {
    let h = ready_harness();
    assert_eq!(h.controller.stop_capture().await.unwrap(), None);
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_second_capture_is_busy() {
    let h = ready_harness();
    h.controller.start_capture().await.unwrap();
    assert!(matches!(h.controller.start_capture().await, Err(SessionError::Busy(_))));
    assert_eq!(h.microphone.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recording_replaces_loaded_clip() {
    let h = loaded_harness().await;
    h.controller.start_capture().await.unwrap();
    h.controller.stop_capture().await.unwrap();
    h.controller.wait_for_engine().await.unwrap();

    assert_eq!(h.controller.live_object_urls().await, 1);
    assert_eq!(h.engines.log.lock().unwrap().live(), 1);
    assert!(h
        .controller
        .snapshot()
        .await
        .metadata()
        .unwrap()
        .name
        .starts_with("recording-"));
}

#[tokio::test]
async fn test_clear_resource_unbinds_clip() {
    let h = loaded_harness().await;
    h.controller.clear_resource().await.unwrap();

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Editing);
    assert!(session.resource().is_none());
    assert!(session.metadata().is_none());
    assert_eq!(h.controller.live_object_urls().await, 0);
    assert_eq!(h.engines.log.lock().unwrap().live(), 0);

    assert!(matches!(h.controller.analyze().await, Err(SessionError::NoResource)));
}

#[tokio::test]
async fn test_analysis_is_stored_verbatim() {
    let h = loaded_harness().await;
    h.backend.push_structured(Ok(ANALYSIS_JSON.to_string()));

    let result = h.controller.analyze().await.unwrap();
    assert_eq!(result.transcript, "Hello world");
    assert_eq!(result.sentiment, "Neutral");
    assert_eq!(result.enhancement_suggestions, vec!["Reduce hiss".to_string()]);
    assert_eq!(result.noise_level, NoiseLevel::Low);
    assert_eq!(result.audio_quality_score, 82.0);

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Editing);
    assert_eq!(session.analysis(), Some(&result));
    assert_eq!(
        session.chat_history(),
        &[ChatMessage::assistant(
            "Analysis complete. Noise level: Low. Quality score: 82/100."
        )]
    );
}

#[tokio::test]
async fn test_failed_analysis_keeps_previous_result() {
    let h = loaded_harness().await;
    h.backend.push_structured(Ok(ANALYSIS_JSON.to_string()));
    let first = h.controller.analyze().await.unwrap();

    h.backend
        .push_structured(Err(AiError::Service { status: 503, message: "unavailable".to_string() }));
    let err = h.controller.analyze().await.unwrap_err();
    assert!(matches!(err, SessionError::Analysis(AiError::Service { status: 503, .. })));

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Editing);
    assert_eq!(session.analysis(), Some(&first));
    assert_eq!(session.chat_history().len(), 1);
}

#[tokio::test]
async fn test_contract_violation_is_an_analysis_error() {
    let h = loaded_harness().await;
    h.backend
        .push_structured(Ok(r#"{"transcript":"hi","sentiment":"Calm"}"#.to_string()));

    let err = h.controller.analyze().await.unwrap_err();
    assert!(matches!(err, SessionError::Analysis(AiError::Contract(_))));
    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Editing);
    assert!(session.analysis().is_none());
    assert!(session.chat_history().is_empty());
}

#[tokio::test]
async fn test_analyze_requires_a_clip() {
    let h = ready_harness();
    let err = h.controller.analyze().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidTransition { status: SessionStatus::Idle, .. }
    ));
    assert_eq!(h.backend.structured_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_engine_error_during_analysis_returns_to_idle() {
    let h = loaded_harness().await;
    let load_id = h.engines.last_load_id();
    h.backend.hold();
    h.backend.push_structured(Ok(ANALYSIS_JSON.to_string()));

    let controller = h.controller.clone();
    let running = tokio::spawn(async move { controller.analyze().await });
    wait_for_status(&h, SessionStatus::Analyzing).await;

    h.controller
        .handle_engine_event(load_id, EngineEvent::Error("decoder crashed".to_string()))
        .await;
    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.resource().is_none());
    assert!(session.last_error().unwrap().contains("decoder crashed"));
    assert_eq!(h.engines.log.lock().unwrap().live(), 0);

    h.backend.release();
    let outcome = running.await.unwrap();
    assert!(matches!(outcome, Err(SessionError::Superseded)));

    let session = h.controller.snapshot().await;
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.analysis().is_none());
    assert!(session.chat_history().is_empty());
}

#[tokio::test]
async fn test_concurrent_analysis_is_busy() {
    let h = loaded_harness().await;
    h.backend.hold();
    h.backend.push_structured(Ok(ANALYSIS_JSON.to_string()));

    let controller = h.controller.clone();
    let running = tokio::spawn(async move { controller.analyze().await });
    wait_for_status(&h, SessionStatus::Analyzing).await;

    assert!(matches!(h.controller.analyze().await, Err(SessionError::Busy(_))));

    h.backend.release();
    running.await.unwrap().unwrap();
    assert_eq!(h.controller.status().await, SessionStatus::Editing);
    assert_eq!(h.backend.structured_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_analysis_is_discarded() {
    let h = loaded_harness().await;
    h.backend.hold();
    h.backend.push_structured(Ok(ANALYSIS_JSON.to_string()));

    let controller = h.controller.clone();
    let running = tokio::spawn(async move { controller.analyze().await });
    wait_for_status(&h, SessionStatus::Analyzing).await;

    let replacement = h
        .controller
        .import_file(Some(wav_file("b.wav", 2048)))
        .await
        .unwrap()
        .unwrap();

    h.backend.release();
    let outcome = running.await.unwrap();
    assert!(matches!(outcome, Err(SessionError::Superseded)));

    h.controller.wait_for_engine().await.unwrap();
    let session = h.controller.snapshot().await;
    assert_eq!(session.resource_id(), Some(replacement));
    assert_eq!(session.status(), SessionStatus::Editing);
    assert!(session.analysis().is_none());
    assert!(session.chat_history().is_empty());
}

#[tokio::test]
async fn test_advisor_appends_question_and_reply() {
    let h = ready_harness();
    h.backend.push_chat(Ok("  Cut around 300 Hz.  ".to_string()));

    let reply = h.controller.advise("How do I reduce muddiness?").await.unwrap();
    assert_eq!(reply, "Cut around 300 Hz.");

    let history = h.controller.snapshot().await.chat_history().to_vec();
    assert_eq!(
        history,
        vec![
            ChatMessage::user("How do I reduce muddiness?"),
            ChatMessage::assistant("Cut around 300 Hz."),
        ]
    );
}

#[tokio::test]
async fn test_advisor_failure_appends_notice() {
    let h = ready_harness();
    h.backend.push_chat(Err(AiError::Network("offline".to_string())));

    let err = h.controller.advise("hello").await.unwrap_err();
    assert!(matches!(err, SessionError::Advisor(AiError::Network(_))));

    let history = h.controller.snapshot().await.chat_history().to_vec();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], ChatMessage::user("hello"));
    assert_eq!(history[1], ChatMessage::assistant(ADVISOR_ERROR_NOTICE));
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let h = ready_harness();
    assert!(matches!(h.controller.advise("   ").await, Err(SessionError::EmptyMessage)));
    assert!(h.controller.snapshot().await.chat_history().is_empty());
}

#[tokio::test]
async fn test_advisor_turns_are_served_in_order() {
    let h = ready_harness();

    let (first, second) = tokio::join!(h.controller.advise("first"), h.controller.advise("second"));
    assert_eq!(first.unwrap(), "re: first");
    assert_eq!(second.unwrap(), "re: second");

    let roles_and_text: Vec<(ChatRole, String)> = h
        .controller
        .snapshot()
        .await
        .chat_history()
        .iter()
        .map(|m| (m.role, m.text.clone()))
        .collect();
    assert_eq!(
        roles_and_text,
        vec![
            (ChatRole::User, "first".to_string()),
            (ChatRole::Assistant, "re: first".to_string()),
            (ChatRole::User, "second".to_string()),
            (ChatRole::Assistant, "re: second".to_string()),
        ]
    );

    let histories = h.backend.chat_histories.lock().unwrap();
    assert!(histories[0].is_empty());
    assert_eq!(histories[1].len(), 2);
}

#[tokio::test]
async fn test_advisor_sees_analysis_summary() {
    let h = loaded_harness().await;
    h.backend.push_structured(Ok(ANALYSIS_JSON.to_string()));
    h.controller.analyze().await.unwrap();

    h.controller.advise("What should I fix first?").await.unwrap();

    let histories = h.backend.chat_histories.lock().unwrap();
    assert_eq!(histories[0].len(), 1);
    assert_eq!(histories[0][0].role, ChatRole::Assistant);
}

#[tokio::test]
async fn test_transport_and_zoom() {
    let h = ready_harness();
    assert_eq!(h.controller.play_pause().await, None);

    h.controller.import_file(Some(wav_file("a.wav", 10))).await.unwrap();
    h.controller.wait_for_engine().await.unwrap();

    assert_eq!(h.controller.play_pause().await, Some(true));
    assert!(h.controller.is_playing().await);
    assert_eq!(h.controller.play_pause().await, Some(false));

    h.controller.play().await;
    h.controller.play().await;
    assert!(h.controller.is_playing().await);
    h.controller.pause().await;
    assert!(!h.controller.is_playing().await);

    h.controller.play_pause().await;
    h.controller.stop_playback().await;
    assert!(!h.controller.is_playing().await);

    assert_eq!(h.controller.set_zoom(0).await, 1);
    assert_eq!(h.controller.set_zoom(500).await, 100);
    assert_eq!(h.controller.set_zoom(42).await, 42);
    assert_eq!(h.controller.zoom().await, 42);
}

#[tokio::test]
async fn test_filter_settings_are_clamped() {
    let h = ready_harness();
    let filters = h
        .controller
        .update_filters(|f| {
            f.set_gain(5.0);
            f.set_low_pass(10);
            f.set_high_pass(250);
            f.set_compression(f32::NAN);
        })
        .await;

    assert_eq!(filters.gain, 2.0);
    assert_eq!(filters.low_pass, 1000);
    assert_eq!(filters.high_pass, 250);
    assert_eq!(filters.compression, 0.0);
    assert_eq!(*h.controller.snapshot().await.filters(), filters);
}
