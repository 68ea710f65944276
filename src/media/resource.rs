//! Loaded audio resources and their ephemeral object URLs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one loaded or recorded clip.
pub type ResourceId = Uuid;

const OBJECT_URL_PREFIX: &str = "blob:audiodesk/";

/// The byte stream of one clip together with the URL it was published under.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Debug, Clone)]
pub struct AudioResource {
    id: ResourceId,
    url: String,
    bytes: Arc<[u8]>,
}

impl AudioResource {
    pub(crate) fn new(id: ResourceId, url: String, bytes: Vec<u8>) -> Self {
        Self {
            id,
            url,
            bytes: Arc::from(bytes),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Descriptive record for the loaded clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetadata {
    /// File name (or generated recording name)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Duration in seconds; 0 until the waveform engine reports it
    pub duration: f64,
    /// MIME type, e.g. "audio/wav"
    pub format: String,
    /// Last-modified time in epoch milliseconds
    pub last_modified: i64,
}

/// Tracks object URLs that are currently published.
///
/// Every load gets a fresh URL; the previous one must be revoked when the
/// resource is superseded or cleared.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    live: HashSet<String>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a URL for the given resource id.
    pub fn create(&mut self, id: ResourceId) -> String {
        let url = format!("{OBJECT_URL_PREFIX}{id}");
        self.live.insert(url.clone());
        tracing::debug!("Object URL created: {}", url);
        url
    }

    /// Revokes a URL. Returns false if it was not live.
    pub fn revoke(&mut self, url: &str) -> bool {
        let revoked = self.live.remove(url);
        if revoked {
            tracing::debug!("Object URL revoked: {}", url);
        } else {
            tracing::warn!("Attempted to revoke unknown object URL: {}", url);
        }
        revoked
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.contains(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
