//! Persistent log of completed analyses.

mod storage;

pub use storage::{AnalysisEntry, HistoryManager};

use std::path::PathBuf;

/// Directory holding the history database (`~/.local/share/audiodesk`).
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the directory cannot be created
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
        .join("audiodesk");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
