//! Record from the microphone.
//!
//! Capture runs until Enter, Ctrl+C or the optional time limit. The clip is
//! then bound like an imported file and can be written out and analyzed.

use console::style;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use super::{analyze_loaded_clip, build_controller, print_analysis, user_facing};
use crate::config::AudiodeskConfig;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Records a clip.
///
/// # Arguments
/// * `seconds` - Stop automatically after this many seconds
/// * `output` - Write the WAV clip to this path
/// * `analyze` - Send the clip for analysis after recording
///
/// # Errors
/// - If the microphone is unavailable
/// - If the clip cannot be encoded or written
/// - If analysis was requested and fails
pub async fn handle_record(
    seconds: Option<u64>,
    output: Option<PathBuf>,
    analyze: bool,
) -> anyhow::Result<()> {
    tracing::info!("=== audiodesk Record Command ===");

    let config = AudiodeskConfig::load()?;
    let controller = build_controller(&config)?;

    controller.start_capture().await.map_err(user_facing)?;

    match seconds {
        Some(limit) => eprintln!("Recording for {limit}s. Press Enter or Ctrl+C to stop early."),
        None => eprintln!("Recording. Press Enter or Ctrl+C to stop."),
    }

    let stop = async {
        match seconds {
            Some(limit) => tokio::time::sleep(Duration::from_secs(limit)).await,
            None => std::future::pending::<()>().await,
        }
    };
    // Detached so a pending read never holds up runtime shutdown
    let (enter_tx, mut enter) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = enter_tx.send(());
        }
    });
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(stop, ctrl_c);

    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            pressed = &mut enter, if stdin_open => {
                if pressed.is_ok() {
                    break;
                }
                stdin_open = false;
            }
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                if let Some(progress) = controller.capture_progress().await {
                    eprint!("\r  {} {:.1}s", style("●").red(), progress.seconds);
                    let _ = std::io::stderr().flush();
                }
            }
        }
    }
    eprintln!();

    controller.stop_capture().await.map_err(user_facing)?;
    let duration = controller.wait_for_engine().await.map_err(user_facing)?;

    let snapshot = controller.snapshot().await;
    let (Some(resource), Some(metadata)) = (snapshot.resource(), snapshot.metadata()) else {
        return Err(anyhow::anyhow!("Recording produced no clip"));
    };

    eprintln!(
        "Recorded {} ({:.1}s, {} bytes)",
        style(&metadata.name).bold(),
        duration,
        resource.len()
    );

    if let Some(path) = output {
        tokio::fs::write(&path, &*resource.bytes())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
        eprintln!("Saved to {}", path.display());
        tracing::info!("Recording written to {}", path.display());
    }

    if analyze {
        let result = analyze_loaded_clip(&controller).await?;
        print_analysis(&result);
    }

    Ok(())
}
