//! Live capture: device traits, the in-progress recording, and WAV encoding.
//!
//! A [`CaptureDevice`] grants (or denies) access to an input device and hands
//! back a [`CaptureStream`]. The controller wraps the stream in an
//! [`ActiveCapture`], which owns the accumulated chunks until the capture is
//! finished. Finishing stops every device track exactly once and encodes the
//! concatenated chunks as a single WAV clip, whatever the device's codec.

use chrono::{DateTime, Local};
use hound::WavWriter;
use std::io::Cursor;
use thiserror::Error;
use uuid::Uuid;

use super::resource::{AudioMetadata, AudioResource, ObjectUrlRegistry};

/// Container format of every recorded clip.
pub const RECORDING_FORMAT: &str = "audio/wav";

/// Errors raised while acquiring or finalizing a capture.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The user or the OS refused access to the input device
    #[error("microphone access was denied: {0}")]
    PermissionDenied(String),

    /// No usable input device, or the device failed to start
    #[error("audio input device unavailable: {0}")]
    Unavailable(String),

    /// The captured samples could not be encoded
    #[error("failed to encode recording: {0}")]
    Encoding(String),
}

/// Sample layout of the chunks a stream produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Access to an input device.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Requests access and starts streaming.
    ///
    /// May suspend while the user answers a permission prompt.
    async fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// A running device stream.
pub trait CaptureStream: Send {
    /// Layout of the produced chunks
    fn format(&self) -> CaptureFormat;

    /// Returns the chunks that arrived since the last call, in arrival order.
    fn drain_chunks(&mut self) -> Vec<Vec<i16>>;

    /// Stops all device tracks, releasing the hardware.
    fn stop(&mut self);

    /// Number of device tracks still running
    fn active_tracks(&self) -> usize;
}

/// A recording in progress. Owns the device stream and the chunks.
pub struct ActiveCapture {
    stream: Box<dyn CaptureStream>,
    chunks: Vec<Vec<i16>>,
    started_at: DateTime<Local>,
    stopped: bool,
}

/// The finished recording, encoded as WAV.
#[derive(Debug, Clone)]
pub struct CapturedClip {
    pub name: String,
    pub bytes: Vec<u8>,
    pub sample_count: usize,
    pub format: CaptureFormat,
    pub recorded_at: DateTime<Local>,
}

impl ActiveCapture {
    pub fn new(stream: Box<dyn CaptureStream>) -> Self {
        Self {
            stream,
            chunks: Vec::new(),
            started_at: Local::now(),
            stopped: false,
        }
    }

    /// Pulls pending chunks from the stream into the recording.
    pub fn accumulate(&mut self) {
        let pending = self.stream.drain_chunks();
        if !pending.is_empty() {
            self.chunks.extend(pending);
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn sample_count(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Seconds of audio accumulated so far.
    pub fn elapsed_audio_secs(&self) -> f64 {
        let format = self.stream.format();
        let frames = self.sample_count() as f64 / format.channels.max(1) as f64;
        frames / format.sample_rate.max(1) as f64
    }

    /// Stops the device, drains the remaining chunks, and encodes the clip.
    ///
    /// # Errors
    /// - If WAV encoding fails
    pub fn finish(mut self) -> Result<CapturedClip, CaptureError> {
        self.release_device();
        self.accumulate();

        let format = self.stream.format();
        let samples: Vec<i16> = std::mem::take(&mut self.chunks).concat();
        let bytes = encode_wav(&samples, format)?;

        let duration_secs =
            samples.len() as f32 / (format.sample_rate.max(1) as f32 * format.channels.max(1) as f32);
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz, {} bytes encoded)",
            duration_secs,
            samples.len(),
            format.sample_rate,
            bytes.len()
        );

        Ok(CapturedClip {
            name: format!("recording-{}.wav", self.started_at.format("%Y%m%d-%H%M%S")),
            bytes,
            sample_count: samples.len(),
            format,
            recorded_at: self.started_at,
        })
    }

    fn release_device(&mut self) {
        if !self.stopped {
            self.stream.stop();
            self.stopped = true;
            tracing::debug!(
                "Capture stream stopped ({} active tracks remain)",
                self.stream.active_tracks()
            );
        }
    }
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        self.release_device();
    }
}

impl CapturedClip {
    /// Publishes the clip under a fresh object URL and builds its metadata.
    pub(crate) fn into_resource(self, urls: &mut ObjectUrlRegistry) -> (AudioResource, AudioMetadata) {
        let id = Uuid::new_v4();
        let url = urls.create(id);
        let metadata = AudioMetadata {
            name: self.name,
            size: self.bytes.len() as u64,
            duration: 0.0,
            format: RECORDING_FORMAT.to_string(),
            last_modified: self.recorded_at.timestamp_millis(),
        };
        (AudioResource::new(id, url, self.bytes), metadata)
    }
}

/// Encodes interleaved 16-bit PCM as an in-memory WAV file.
///
/// # Errors
/// - If the WAV writer rejects the samples
pub fn encode_wav(samples: &[i16], format: CaptureFormat) -> Result<Vec<u8>, CaptureError> {
    let wav_spec = hound::WavSpec {
        channels: format.channels.max(1),
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, wav_spec)
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
