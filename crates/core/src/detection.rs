//! Call-answer classification results

use serde::{Deserialize, Serialize};

/// What answered an outbound call.
///
/// Only `Unknown` may be overwritten on a call session; any other value,
/// once recorded, is immutable for the remainder of that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionResult {
    /// A human picked up
    LivePerson,
    /// Voicemail / answering machine
    AnsweringMachine,
    /// Automated menu system ("press 1 for...")
    IvrMenu,
    /// Automated screening system asking who is calling
    AutomatedGatekeeper,
    /// No conclusive signal yet
    #[default]
    Unknown,
}

impl DetectionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LivePerson => "live_person",
            Self::AnsweringMachine => "answering_machine",
            Self::IvrMenu => "ivr_menu",
            Self::AutomatedGatekeeper => "automated_gatekeeper",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this result concludes classification for a call
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conclusive() {
        assert!(!DetectionResult::Unknown.is_conclusive());
        assert!(DetectionResult::LivePerson.is_conclusive());
        assert!(DetectionResult::AnsweringMachine.is_conclusive());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&DetectionResult::IvrMenu).unwrap();
        assert_eq!(json, "\"ivr_menu\"");
    }
}
