//! Analyze an audio file from disk.

use std::path::PathBuf;

use super::{analyze_loaded_clip, build_controller, print_analysis, user_facing};
use crate::config::AudiodeskConfig;
use crate::media::FileInput;

/// Imports `file`, waits for the engine to decode it and prints the analysis.
///
/// # Errors
/// - If the file cannot be read or decoded
/// - If the analysis request fails
pub async fn handle_analyze(file: PathBuf, json: bool) -> anyhow::Result<()> {
    tracing::info!("=== audiodesk Analyze Command ===");

    if !file.exists() {
        return Err(anyhow::anyhow!("Audio file not found: {}", file.display()));
    }

    let config = AudiodeskConfig::load()?;
    let controller = build_controller(&config)?;

    let input = FileInput::from_path(&file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;
    controller.import_file(Some(input)).await.map_err(user_facing)?;
    let duration = controller.wait_for_engine().await.map_err(user_facing)?;
    tracing::info!("Loaded {} ({:.2}s)", file.display(), duration);

    let result = analyze_loaded_clip(&controller).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_analysis(&result);
    }
    Ok(())
}
