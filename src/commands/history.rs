//! Analysis history listing.

use console::style;

use crate::history::{self, HistoryManager};

/// Prints stored analyses, most recent first.
///
/// # Errors
/// - If the data directory cannot be determined
/// - If the history database cannot be read
pub fn handle_history(limit: Option<usize>) -> anyhow::Result<()> {
    tracing::info!("=== audiodesk History ===");

    let data_dir = history::data_dir()?;
    let mut history_manager = HistoryManager::new(&data_dir);
    let entries = history_manager.get_all_analyses()?;

    if entries.is_empty() {
        println!("No analysis history found.");
        return Ok(());
    }

    let shown = limit.unwrap_or(entries.len()).min(entries.len());
    for entry in entries.iter().take(shown) {
        println!(
            "{} {}  {}  {}",
            style(format!("#{}", entry.id)).dim(),
            entry.created_at.format("%Y-%m-%d %H:%M"),
            style(&entry.file_name).bold(),
            style(&entry.format).dim()
        );
        println!(
            "    quality {}/100, noise {}, {}",
            entry.result.audio_quality_score, entry.result.noise_level, entry.result.sentiment
        );
        for suggestion in &entry.result.enhancement_suggestions {
            println!("    - {suggestion}");
        }
    }

    if shown < entries.len() {
        println!();
        println!("{}", style(format!("{} older entries not shown", entries.len() - shown)).dim());
    }

    Ok(())
}
