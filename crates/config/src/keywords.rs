//! Classifier keyword sets
//!
//! An immutable configuration object injected into the transcript
//! classifier at construction. Matching is case-insensitive substring for
//! `*_keywords` entries; `*_patterns` entries are regular expressions
//! compiled once by the classifier.
//!
//! Priority order is fixed by the classifier, not by this struct:
//! IVR -> voicemail -> gatekeeper -> greeting.

use serde::{Deserialize, Serialize};

/// Keyword and pattern sets for call-answer classification.
///
/// English defaults only; per-deployment sets are loaded from the settings
/// file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// IVR menu prompts ("press 1 for sales")
    #[serde(default = "default_ivr_keywords")]
    pub ivr_keywords: Vec<String>,

    /// IVR regex patterns (digit prompts, menu phrasing)
    #[serde(default = "default_ivr_patterns")]
    pub ivr_patterns: Vec<String>,

    /// Voicemail / answering machine greetings
    #[serde(default = "default_voicemail_keywords")]
    pub voicemail_keywords: Vec<String>,

    /// Automated gatekeeper / call-screening prompts
    #[serde(default = "default_gatekeeper_keywords")]
    pub gatekeeper_keywords: Vec<String>,

    /// Live-person greetings
    #[serde(default = "default_greeting_keywords")]
    pub greeting_keywords: Vec<String>,
}

fn default_ivr_keywords() -> Vec<String> {
    [
        "press 1",
        "press one",
        "press 2",
        "press two",
        "para espanol",
        "for sales",
        "for support",
        "for billing",
        "main menu",
        "enter your",
        "dial the extension",
        "listen carefully as our menu options",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ivr_patterns() -> Vec<String> {
    [
        r"press\s+\d",
        r"press\s+(one|two|three|four|five|six|seven|eight|nine|zero|pound|star)",
        r"for\s+\w+,?\s+press",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_voicemail_keywords() -> Vec<String> {
    [
        "leave a message",
        "leave your message",
        "after the beep",
        "after the tone",
        "at the tone",
        "voicemail",
        "voice mail",
        "mailbox",
        "is not available",
        "are not available",
        "cannot take your call",
        "can't take your call",
        "you have reached",
        "you've reached",
        "record your message",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_gatekeeper_keywords() -> Vec<String> {
    [
        "who is calling",
        "who's calling",
        "may i ask who",
        "state your name",
        "say your name",
        "the person you are trying to reach",
        "screening",
        "this call is being screened",
        "what is this regarding",
        "state the purpose of your call",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_greeting_keywords() -> Vec<String> {
    [
        "hello?",
        "hi there",
        "speaking",
        "this is",
        "who is this",
        "yes?",
        "good morning",
        "good afternoon",
        "good evening",
        "how can i help",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            ivr_keywords: default_ivr_keywords(),
            ivr_patterns: default_ivr_patterns(),
            voicemail_keywords: default_voicemail_keywords(),
            gatekeeper_keywords: default_gatekeeper_keywords(),
            greeting_keywords: default_greeting_keywords(),
        }
    }
}

impl KeywordConfig {
    /// True when every set is empty (keyword classification disabled)
    pub fn is_empty(&self) -> bool {
        self.ivr_keywords.is_empty()
            && self.ivr_patterns.is_empty()
            && self.voicemail_keywords.is_empty()
            && self.gatekeeper_keywords.is_empty()
            && self.greeting_keywords.is_empty()
    }
}
