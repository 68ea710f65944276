//! Analysis history storage and retrieval using SQLite.
//!
//! Every successful analysis is stored with the clip it was produced for,
//! so earlier results can be listed after the session is gone.

use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::OptionalExtension;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};

use crate::ai::{AnalysisResult, NoiseLevel};

/// A stored analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisEntry {
    pub id: i64,
    /// Name of the analyzed clip
    pub file_name: String,
    /// MIME type of the analyzed clip
    pub format: String,
    pub result: AnalysisResult,
    pub created_at: DateTime<Local>,
}

/// Manages the analysis history database.
pub struct HistoryManager {
    database_path: PathBuf,
    /// Opened on first use
    connection: Option<Connection>,
}

impl HistoryManager {
    /// Creates a history manager storing `analysis_history.db` in `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            database_path: data_dir.join("analysis_history.db"),
            connection: None,
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Opens the database and creates the table if necessary.
    ///
    /// # Errors
    /// - If the database file cannot be opened
    /// - If table creation fails
    fn get_connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection = Connection::open(&self.database_path)?;

            connection.execute(
                "CREATE TABLE IF NOT EXISTS analyses (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_name TEXT NOT NULL,
                    format TEXT NOT NULL,
                    transcript TEXT NOT NULL,
                    sentiment TEXT NOT NULL,
                    suggestions TEXT NOT NULL,
                    noise_level TEXT NOT NULL,
                    quality_score REAL NOT NULL,
                    created_at TEXT NOT NULL
                )",
                [],
            )?;

            self.connection = Some(connection);
        }

        self.connection
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("history database is not open"))
    }

    /// Stores an analysis and returns its row id.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If insertion fails
    pub fn save_analysis(
        &mut self,
        file_name: &str,
        format: &str,
        result: &AnalysisResult,
    ) -> Result<i64> {
        let suggestions = serde_json::to_string(&result.enhancement_suggestions)?;
        let connection = self.get_connection()?;

        connection.execute(
            "INSERT INTO analyses
                (file_name, format, transcript, sentiment, suggestions, noise_level, quality_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                file_name,
                format,
                result.transcript,
                result.sentiment,
                suggestions,
                result.noise_level.to_string(),
                result.audio_quality_score,
                Local::now().to_rfc3339(),
            ],
        )?;

        let id = connection.last_insert_rowid();
        tracing::debug!("Analysis of {} saved to history as #{}", file_name, id);
        Ok(id)
    }

    /// Retrieves all analyses, most recent first.
    ///
    /// # Errors
    /// - If database connection or the query fails
    /// - If a stored row cannot be decoded
    pub fn get_all_analyses(&mut self) -> Result<Vec<AnalysisEntry>> {
        let connection = self.get_connection()?;

        let mut statement = connection.prepare(
            "SELECT id, file_name, format, transcript, sentiment, suggestions, noise_level, quality_score, created_at
             FROM analyses ORDER BY created_at DESC, id DESC",
        )?;

        let entries = statement
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Retrieves a single analysis by id.
    ///
    /// # Errors
    /// - If database connection or the query fails
    pub fn get_analysis(&mut self, id: i64) -> Result<Option<AnalysisEntry>> {
        let connection = self.get_connection()?;

        let entry = connection
            .query_row(
                "SELECT id, file_name, format, transcript, sentiment, suggestions, noise_level, quality_score, created_at
                 FROM analyses WHERE id = ?1",
                params![id],
                entry_from_row,
            )
            .optional()?;

        Ok(entry)
    }
}

fn invalid_column(what: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidParameterName(format!("Invalid {what} in analysis history"))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisEntry> {
    let suggestions: String = row.get(5)?;
    let noise_label: String = row.get(6)?;
    let timestamp: String = row.get(8)?;

    let enhancement_suggestions: Vec<String> =
        serde_json::from_str(&suggestions).map_err(|_| invalid_column("suggestion list"))?;
    let noise_level = NoiseLevel::from_label(&noise_label).ok_or_else(|| invalid_column("noise level"))?;
    let created_at = DateTime::parse_from_rfc3339(&timestamp)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|_| invalid_column("timestamp"))?;

    Ok(AnalysisEntry {
        id: row.get(0)?,
        file_name: row.get(1)?,
        format: row.get(2)?,
        result: AnalysisResult {
            transcript: row.get(3)?,
            sentiment: row.get(4)?,
            enhancement_suggestions,
            noise_level,
            audio_quality_score: row.get(7)?,
        },
        created_at,
    })
}
