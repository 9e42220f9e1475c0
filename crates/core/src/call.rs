//! Call session state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::DetectionResult;

/// How a decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Keyword/pattern match on accumulated transcript
    Keyword,
    /// Speech-cadence heuristic
    Timing,
    /// Beep tone detected in the audio stream
    Tone,
    /// Detection window elapsed without a conclusive signal (fail-open)
    WindowExpired,
}

/// Decision state of a call session.
///
/// The state machine only moves forward: `Collecting` -> `Decided`. The
/// fail-open timeout path passes through a logged `Expired` transition but
/// lands in `Decided(LivePerson)` atomically, so `Expired` never needs to be
/// observable between signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionState {
    /// Signals are still being aggregated
    Collecting,
    /// Classification is frozen for the remainder of the call
    Decided {
        result: DetectionResult,
        source: DecisionSource,
    },
}

impl DecisionState {
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Decided { .. })
    }

    /// The frozen result, if any
    pub fn result(&self) -> Option<DetectionResult> {
        match self {
            Self::Decided { result, .. } => Some(*result),
            Self::Collecting => None,
        }
    }
}

/// One outbound call attempt.
///
/// Owned exclusively by its `DetectionWindowController` for the duration of
/// the call and destroyed when the call ends. Single writer: only the owning
/// controller mutates the transcript buffer and decision state.
#[derive(Debug, Clone)]
pub struct CallSession {
    /// Telephony-layer call/room identifier
    pub call_id: String,
    /// CRM lead this call attempt belongs to
    pub lead_id: String,
    /// Dialed number
    pub phone_number: String,
    /// Monotonic connect instant, used for window timing
    pub connected_at: Instant,
    /// Wall-clock connect time, used for records
    pub connected_at_utc: DateTime<Utc>,
    /// Accumulated callee transcript text
    pub transcript: String,
    /// Current decision state
    pub decision: DecisionState,
}

impl CallSession {
    pub fn new(
        call_id: impl Into<String>,
        lead_id: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            lead_id: lead_id.into(),
            phone_number: phone_number.into(),
            connected_at: Instant::now(),
            connected_at_utc: Utc::now(),
            transcript: String::new(),
            decision: DecisionState::Collecting,
        }
    }

    /// Append callee text to the accumulated transcript buffer
    pub fn append_transcript(&mut self, text: &str) {
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(text);
    }
}
