//! Local file import.

use chrono::Utc;
use std::path::Path;
use uuid::Uuid;

use super::resource::{AudioMetadata, AudioResource, ObjectUrlRegistry};

/// A user-provided audio file: name, bytes, MIME type and modification time.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
    /// Epoch milliseconds
    pub last_modified: i64,
}

impl FileInput {
    /// Creates a file input stamped with the current time.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: mime.into(),
            last_modified: Utc::now().timestamp_millis(),
        }
    }

    /// Reads a file from disk without blocking the runtime.
    ///
    /// # Errors
    /// - If the file cannot be read
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let last_modified = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        tracing::debug!("Read {} ({} bytes)", path.display(), bytes.len());

        Ok(Self {
            name,
            bytes,
            mime: guess_mime(path).to_string(),
            last_modified,
        })
    }

    /// Publishes the bytes under a fresh object URL and builds the metadata
    /// record. Duration stays 0 until the engine decodes the clip.
    pub(crate) fn into_resource(self, urls: &mut ObjectUrlRegistry) -> (AudioResource, AudioMetadata) {
        let id = Uuid::new_v4();
        let url = urls.create(id);
        let metadata = AudioMetadata {
            name: self.name,
            size: self.bytes.len() as u64,
            duration: 0.0,
            format: self.mime,
            last_modified: self.last_modified,
        };
        (AudioResource::new(id, url, self.bytes), metadata)
    }
}

/// Maps a file extension to an audio MIME type.
pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}
