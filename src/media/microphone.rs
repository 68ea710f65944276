//! Microphone capture through cpal.
//!
//! The cpal stream lives on a dedicated thread for its whole lifetime so the
//! handle given to the controller stays `Send` on every platform. Stopping the
//! stream drops it on that thread and joins it, which releases the device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::capture::{CaptureDevice, CaptureError, CaptureFormat, CaptureStream};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Input device selected by name, numeric index, or "default".
#[derive(Debug, Clone)]
pub struct MicrophoneDevice {
    device_name: String,
    requested_sample_rate: u32,
}

impl MicrophoneDevice {
    /// # Arguments
    /// * `device_name` - "default", a numeric index, or a device name from `audiodesk list-devices`
    /// * `requested_sample_rate` - Preferred rate in Hz; the device rate wins if they differ
    pub fn new(device_name: impl Into<String>, requested_sample_rate: u32) -> Self {
        Self {
            device_name: device_name.into(),
            requested_sample_rate,
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MicrophoneDevice {
    async fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (chunk_tx, chunk_rx) = std::sync::mpsc::channel::<Vec<i16>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let active_tracks = Arc::new(AtomicUsize::new(0));

        let device_name = self.device_name.clone();
        let requested_sample_rate = self.requested_sample_rate;
        let thread_tracks = Arc::clone(&active_tracks);

        let thread = std::thread::Builder::new()
            .name("audiodesk-capture".to_string())
            .spawn(move || {
                let stream = match build_input_stream(&device_name, requested_sample_rate, chunk_tx) {
                    Ok((stream, format)) => {
                        thread_tracks.store(1, Ordering::SeqCst);
                        let _ = ready_tx.send(Ok(format));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Parks until stop() is called or the handle is dropped
                let _ = stop_rx.recv();
                drop(stream);
                thread_tracks.store(0, Ordering::SeqCst);
                tracing::debug!("Audio stream released");
            })
            .map_err(|e| CaptureError::Unavailable(format!("failed to spawn capture thread: {e}")))?;

        let format = match ready_rx.await {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                return Err(CaptureError::Unavailable(
                    "capture thread exited before the stream started".to_string(),
                ))
            }
        };

        tracing::debug!(
            "Audio stream started: {}Hz, {} channel(s)",
            format.sample_rate,
            format.channels
        );

        Ok(Box::new(MicrophoneStream {
            format,
            chunks: chunk_rx,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            active_tracks,
        }))
    }

    fn name(&self) -> &str {
        &self.device_name
    }
}

struct MicrophoneStream {
    format: CaptureFormat,
    chunks: Receiver<Vec<i16>>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    active_tracks: Arc<AtomicUsize>,
}

impl CaptureStream for MicrophoneStream {
    fn format(&self) -> CaptureFormat {
        self.format
    }

    fn drain_chunks(&mut self) -> Vec<Vec<i16>> {
        self.chunks.try_iter().collect()
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Capture thread panicked");
            }
        }
        self.active_tracks.store(0, Ordering::SeqCst);
    }

    fn active_tracks(&self) -> usize {
        self.active_tracks.load(Ordering::SeqCst)
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opens the configured device and starts a mono i16 input stream.
fn build_input_stream(
    device_name: &str,
    requested_sample_rate: u32,
    chunk_tx: Sender<Vec<i16>>,
) -> Result<(cpal::Stream, CaptureFormat), CaptureError> {
    let device = with_alsa_warnings_suppressed(|| {
        let host = cpal::default_host();
        if device_name == "default" {
            host.default_input_device()
                .ok_or_else(|| CaptureError::Unavailable("no audio input device available".to_string()))
        } else {
            find_device_by_name(&host, device_name)
        }
    })?;

    let resolved_name = device
        .name()
        .unwrap_or_else(|_| "Unknown device".to_string());
    tracing::info!("Recording device: {}", resolved_name);

    let device_config = device
        .default_input_config()
        .map_err(|e| CaptureError::Unavailable(e.to_string()))?;
    let sample_rate = device_config.sample_rate().0;
    let channels = device_config.channels() as usize;

    if sample_rate != requested_sample_rate {
        tracing::warn!(
            "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
            requested_sample_rate,
            sample_rate
        );
    }

    let stream_config: cpal::StreamConfig = device_config.config();

    let stream = match device_config.sample_format() {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = chunk_tx.send(downmix(data, channels));
            },
            stream_error,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let converted: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                let _ = chunk_tx.send(downmix(&converted, channels));
            },
            stream_error,
            None,
        ),
        other => {
            return Err(CaptureError::Unavailable(format!(
                "unsupported input sample format: {other:?}"
            )))
        }
    }
    .map_err(map_build_error)?;

    stream
        .play()
        .map_err(|e| CaptureError::Unavailable(e.to_string()))?;

    Ok((
        stream,
        CaptureFormat {
            sample_rate,
            channels: 1,
        },
    ))
}

fn stream_error(err: cpal::StreamError) {
    tracing::error!("Audio stream error: {}", err);
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::BackendSpecific { err } => {
            let description = err.description.to_lowercase();
            if description.contains("permission") || description.contains("denied") {
                CaptureError::PermissionDenied(err.description)
            } else {
                CaptureError::Unavailable(err.description)
            }
        }
        other => CaptureError::Unavailable(other.to_string()),
    }
}

/// Converts interleaved multi-channel samples to mono by averaging channels.
pub(crate) fn downmix(data: &[i16], channels: usize) -> Vec<i16> {
    match channels {
        0 | 1 => data.to_vec(),
        _ => data
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect(),
    }
}

/// Finds an input device by numeric index or exact name.
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, CaptureError> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| CaptureError::Unavailable(format!("failed to enumerate devices: {e}")))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            CaptureError::Unavailable(format!(
                "device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        });
    }

    devices
        .into_iter()
        .find(|d| d.name().map(|n| n == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            CaptureError::Unavailable(format!(
                "audio input device '{device_spec}' not found. Use 'audiodesk list-devices' to see available devices."
            ))
        })
}

/// Runs `f` with stderr pointed at /dev/null to hide ALSA probe noise.
/// If the redirect cannot be set up, `f` runs unchanged.
#[cfg(target_os = "linux")]
pub(crate) fn with_alsa_warnings_suppressed<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    let dev_null = match OpenOptions::new().write(true).open("/dev/null") {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("Could not open /dev/null: {}", e);
            return f();
        }
    };

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn with_alsa_warnings_suppressed<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    f()
}
