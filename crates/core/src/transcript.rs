//! Transcript segment types from the upstream ASR layer

use serde::{Deserialize, Serialize};

/// Who produced a transcript segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The voice agent itself
    Agent,
    /// Whoever (or whatever) answered the call
    Callee,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Callee => "callee",
        }
    }
}

/// A single transcript segment produced by the ASR layer.
///
/// Appended only by the upstream transcript source; the classifier treats
/// segments as read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub speaker: Speaker,
    pub text: String,
    /// Final segments are stable; non-final ones may still be revised upstream
    pub is_final: bool,
    /// Milliseconds since call connect
    pub timestamp_ms: u64,
}

impl TranscriptSegment {
    pub fn new(speaker: Speaker, text: impl Into<String>, is_final: bool, timestamp_ms: u64) -> Self {
        Self {
            speaker,
            text: text.into(),
            is_final,
            timestamp_ms,
        }
    }

    /// Shorthand for a final callee segment, the common case for screening
    pub fn callee(text: impl Into<String>, timestamp_ms: u64) -> Self {
        Self::new(Speaker::Callee, text, true, timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_roundtrip() {
        let seg = TranscriptSegment::callee("Hello?", 1200);
        assert_eq!(seg.speaker, Speaker::Callee);
        assert!(seg.is_final);

        let json = serde_json::to_string(&seg).unwrap();
        let back: TranscriptSegment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, "Hello?");
        assert_eq!(back.timestamp_ms, 1200);
    }
}
