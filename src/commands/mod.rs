//! Application command handlers for audiodesk.
//!
//! # Commands
//! - `analyze`: Import a file and print its AI analysis
//! - `record`: Capture from the microphone, optionally save and analyze
//! - `chat`: Talk to the mixing advisor, optionally about a clip
//! - `history`: List stored analyses
//! - `config`: Open the configuration file in the user's editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod analyze;
pub mod chat;
pub mod config;
pub mod history;
pub mod list_devices;
pub mod logs;
pub mod record;

pub use analyze::handle_analyze;
pub use chat::handle_chat;
pub use config::handle_config;
pub use history::handle_history;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::handle_record;

use console::style;
use std::sync::Arc;

use crate::ai::{AnalysisResult, GeminiClient};
use crate::config::{api_key_from_env, AudiodeskConfig};
use crate::history::{self as analysis_history, HistoryManager};
use crate::media::MicrophoneDevice;
use crate::session::{SessionController, SessionError};
use crate::waveform::HeadlessEngineFactory;

/// Wires a controller to the microphone, the headless engine and Gemini.
///
/// # Errors
/// - If the HTTP client cannot be built
pub fn build_controller(config: &AudiodeskConfig) -> anyhow::Result<SessionController> {
    let backend = GeminiClient::new(&config.ai, api_key_from_env())?;
    if !backend.has_api_key() {
        eprintln!(
            "{}",
            style("GEMINI_API_KEY is not set; analysis and advice will fail.").yellow()
        );
    }

    let microphone = MicrophoneDevice::new(config.audio.device.clone(), config.audio.sample_rate);

    Ok(SessionController::new(
        Arc::new(HeadlessEngineFactory),
        Arc::new(microphone),
        Arc::new(backend),
        config.waveform.clone(),
    ))
}

/// Logs a controller error and turns it into a message for the terminal.
pub(crate) fn user_facing(error: SessionError) -> anyhow::Error {
    tracing::error!("{error}");
    anyhow::anyhow!(error.user_message())
}

/// Runs an analysis of the loaded clip and records it in the history.
///
/// # Errors
/// - If the controller rejects or fails the analysis
pub(crate) async fn analyze_loaded_clip(controller: &SessionController) -> anyhow::Result<AnalysisResult> {
    eprintln!("{}", style("Analyzing...").dim());
    let result = controller.analyze().await.map_err(user_facing)?;

    let snapshot = controller.snapshot().await;
    if let Some(metadata) = snapshot.metadata() {
        let saved = analysis_history::data_dir().and_then(|dir| {
            HistoryManager::new(&dir).save_analysis(&metadata.name, &metadata.format, &result)
        });
        if let Err(e) = saved {
            tracing::warn!("Failed to save analysis to history: {e}");
        }
    }

    Ok(result)
}

pub(crate) fn print_analysis(result: &AnalysisResult) {
    println!();
    println!(
        "{} {}/100    {} {}    {} {}",
        style("Quality").bold(),
        result.audio_quality_score,
        style("Noise").bold(),
        result.noise_level,
        style("Sentiment").bold(),
        result.sentiment
    );
    println!();
    println!("{}", style("Transcript").bold());
    if result.transcript.trim().is_empty() {
        println!("  {}", style("(no speech detected)").dim());
    } else {
        println!("  {}", result.transcript.trim());
    }
    if !result.enhancement_suggestions.is_empty() {
        println!();
        println!("{}", style("Suggestions").bold());
        for suggestion in &result.enhancement_suggestions {
            println!("  {} {}", style("•").cyan(), suggestion);
        }
    }
    println!();
}
