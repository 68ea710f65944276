use thiserror::Error;

use super::state::SessionStatus;
use crate::ai::AiError;
use crate::media::CaptureError;

/// Typed outcome of a failed controller operation.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Microphone permission denied or no usable device; the session is unchanged
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(#[source] CaptureError),

    /// An operation of the same kind is already in flight
    #[error("cannot {0}: another operation is in progress")]
    Busy(&'static str),

    #[error("no audio clip is loaded")]
    NoResource,

    #[error("cannot {operation} while the session is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: SessionStatus,
    },

    /// The engine could not decode the clip; the session returned to Idle
    #[error("unplayable audio: {0}")]
    Unplayable(String),

    #[error("recording failed: {0}")]
    Capture(#[source] CaptureError),

    #[error("analysis failed: {0}")]
    Analysis(#[source] AiError),

    #[error("advisor request failed: {0}")]
    Advisor(#[source] AiError),

    /// The clip changed while the request was in flight; the result was dropped
    #[error("result discarded because the clip changed while the request was in flight")]
    Superseded,

    #[error("message is empty")]
    EmptyMessage,
}

impl SessionError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::DeviceUnavailable(_) => {
                "Microphone unavailable. Check that a device is connected and access is allowed."
                    .to_string()
            }
            SessionError::Unplayable(_) => {
                "This file could not be decoded. Try a WAV file.".to_string()
            }
            other => other.to_string(),
        }
    }
}
