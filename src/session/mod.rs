//! Session lifecycle management.
//!
//! This module provides the [`SessionController`], which mediates between:
//! - user actions (import, record, analyze, chat, transport)
//! - the capture device and the waveform engine
//! - the asynchronous AI calls
//!
//! and keeps the [`Session`] consistent while those operations overlap.

mod controller;
mod error;
mod state;

pub use controller::{CaptureProgress, SessionController};
pub use error::SessionError;
pub use state::{FilterSettings, Session, SessionStatus};
