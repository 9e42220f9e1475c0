//! Core types and traits for the call-screening engine
//!
//! This crate provides foundational types used across all other crates:
//! - Audio frame types for tone analysis
//! - Transcript segment types from the upstream ASR layer
//! - Call session and decision state
//! - Detection result and hangup/navigation event types
//! - Seam traits for telephony actuation and decision hand-off
//! - Error types

pub mod audio;
pub mod call;
pub mod detection;
pub mod error;
pub mod events;
pub mod traits;
pub mod transcript;

pub use audio::{AudioFrame, SampleRate};
pub use call::{CallSession, DecisionSource, DecisionState};
pub use detection::DetectionResult;
pub use error::TelephonyError;
pub use events::{
    ControlEvent, HangupEvent, HangupReason, NavigationAction, NavigationCommand,
};
pub use traits::{DecisionSink, TelephonyControl};
pub use transcript::{Speaker, TranscriptSegment};
