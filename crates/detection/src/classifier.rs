//! Transcript classification rules
//!
//! Ordered keyword/pattern matching over accumulated callee transcript text,
//! plus a secondary speech-cadence heuristic. Both are pure functions: same
//! input, same output, no shared state.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use dialer_config::KeywordConfig;
use dialer_core::DetectionResult;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Keyword/pattern transcript classifier.
///
/// Evaluation order is a deliberate tie-break and must be preserved:
/// IVR -> voicemail -> gatekeeper -> live greeting -> Unknown. IVR prompts
/// routinely contain voicemail-sounding phrases ("leave a message after
/// selecting..."), so the menu check runs first.
pub struct TranscriptClassifier {
    config: KeywordConfig,
    ivr_patterns: Vec<Regex>,
}

impl TranscriptClassifier {
    /// Build a classifier over an immutable keyword configuration.
    ///
    /// Invalid regex patterns are skipped with a warning rather than
    /// failing construction; keyword sets still apply.
    pub fn new(config: KeywordConfig) -> Self {
        let ivr_patterns = config
            .ivr_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Skipping invalid IVR pattern");
                    None
                },
            })
            .collect();

        Self {
            config,
            ivr_patterns,
        }
    }

    /// Classify accumulated transcript text.
    pub fn classify(&self, text: &str) -> DetectionResult {
        let normalized = WHITESPACE
            .replace_all(text.trim(), " ")
            .to_lowercase();

        if normalized.is_empty() {
            return DetectionResult::Unknown;
        }

        if self.matches_ivr(&normalized) {
            return DetectionResult::IvrMenu;
        }

        if Self::contains_any(&normalized, &self.config.voicemail_keywords) {
            return DetectionResult::AnsweringMachine;
        }

        if Self::contains_any(&normalized, &self.config.gatekeeper_keywords) {
            return DetectionResult::AutomatedGatekeeper;
        }

        if Self::contains_any(&normalized, &self.config.greeting_keywords) {
            return DetectionResult::LivePerson;
        }

        DetectionResult::Unknown
    }

    /// Classify by speech cadence alone.
    ///
    /// `duration` is the span of callee speech observed so far and
    /// `pause_count` the number of natural gaps within it:
    /// - a long monologue with almost no pauses reads as a recorded greeting
    /// - many regular pauses over a sustained span read as a menu
    /// - a short utterance with at least one pause reads as a person
    pub fn classify_by_timing(duration: Duration, pause_count: u32) -> DetectionResult {
        let secs = duration.as_secs_f64();

        if secs > 15.0 && pause_count < 2 {
            return DetectionResult::AnsweringMachine;
        }

        if pause_count >= 3 && secs > 8.0 {
            return DetectionResult::IvrMenu;
        }

        if secs > 0.0 && secs <= 6.0 && pause_count >= 1 {
            return DetectionResult::LivePerson;
        }

        DetectionResult::Unknown
    }

    fn matches_ivr(&self, normalized: &str) -> bool {
        Self::contains_any(normalized, &self.config.ivr_keywords)
            || self.ivr_patterns.iter().any(|re| re.is_match(normalized))
    }

    fn contains_any(normalized: &str, keywords: &[String]) -> bool {
        keywords
            .iter()
            .any(|k| !k.is_empty() && normalized.contains(&k.to_lowercase()))
    }
}
