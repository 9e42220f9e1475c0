//! Seam traits for pluggable backends
//!
//! The engine talks to the outside world through two narrow traits:
//! `TelephonyControl` for actuation against the telephony service, and
//! `DecisionSink` for handing a frozen classification to the action side.

use async_trait::async_trait;

use crate::{CallSession, DetectionResult, NavigationCommand, TelephonyError};

/// Actuation against the external telephony service (room/call control).
///
/// Implementations live outside this workspace; tests use mocks.
#[async_trait]
pub trait TelephonyControl: Send + Sync {
    /// Terminate the call. Must be safe to call for an already-ended call.
    async fn hangup(&self, call_id: &str, reason: &str) -> Result<(), TelephonyError>;

    /// Actuate a menu-navigation action via DTMF or synthesized speech
    async fn navigate(&self, command: &NavigationCommand) -> Result<(), TelephonyError>;
}

/// Receiver of a frozen classification.
///
/// The `DetectionWindowController` invokes this exactly once per call, with
/// the session snapshot taken at decision time.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn on_decision(&self, session: &CallSession, result: DetectionResult);
}
