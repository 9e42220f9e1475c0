//! Call-answer classification engine
//!
//! This crate decides, within a bounded window after an outbound call
//! connects, what answered the call:
//! - Beep-tone detection over audio frames (ToneDetector)
//! - Ordered keyword/pattern rules over the accumulated transcript
//!   (TranscriptClassifier) plus a speech-cadence heuristic
//! - A one-shot, fail-open decision state machine per call
//!   (DetectionWindowController)

pub mod classifier;
pub mod tone;
pub mod window;

pub use classifier::TranscriptClassifier;
pub use tone::ToneDetector;
pub use window::{DetectionWindowController, WindowSnapshot};

use thiserror::Error;

/// Detection errors.
///
/// These stay internal to the signal paths: malformed input is recovered
/// locally as `Unknown`/`false`, never propagated upward as a failure.
#[derive(Error, Debug, Clone)]
pub enum DetectionError {
    #[error("FFT error: {0}")]
    Fft(String),

    #[error("Malformed audio frame: {0}")]
    MalformedFrame(String),
}
