//! Media acquisition for audiodesk.
//!
//! Audio reaches a session either from a file on disk or from live microphone
//! capture. Both paths end in the same place: an [`AudioResource`] with an
//! ephemeral object URL plus an [`AudioMetadata`] record whose duration is
//! filled in later by the waveform engine.

pub mod capture;
pub mod file;
pub mod microphone;
pub mod resource;

pub use capture::{
    encode_wav, ActiveCapture, CaptureDevice, CaptureError, CaptureFormat, CaptureStream,
    CapturedClip, RECORDING_FORMAT,
};
pub use file::{guess_mime, FileInput};
pub use microphone::MicrophoneDevice;
pub use resource::{AudioMetadata, AudioResource, ObjectUrlRegistry, ResourceId};
