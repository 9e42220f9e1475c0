//! Control-plane events exchanged between the dispatcher and actuation loops

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Why a call is being hung up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HangupReason {
    /// Voicemail detected; callback scheduled
    AnsweringMachine,
    /// IVR menu navigation timed out or exhausted its attempts
    IvrMenuTimeout,
    /// Operator-requested teardown (transfer completed, shift end, etc.)
    Operator,
}

impl HangupReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnsweringMachine => "answering_machine",
            Self::IvrMenuTimeout => "ivr_menu_timeout",
            Self::Operator => "operator",
        }
    }
}

/// A request to terminate a call.
///
/// Published only by the `ActionDispatcher`, consumed only by the
/// `CallTerminationCoordinator`. Idempotency key is `call_id`: repeat events
/// for the same call are no-ops at the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HangupEvent {
    pub call_id: String,
    pub reason: HangupReason,
    /// Whether a callback record was written before this hangup
    pub callback_scheduled: bool,
}

/// Navigation actions for automated menu systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationAction {
    /// Ask for / press through to a human operator
    RequestOperator,
    /// Press a specific DTMF digit
    PressDigit(u8),
}

/// A menu-navigation request actuated via DTMF or synthesized speech
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationCommand {
    pub call_id: String,
    pub action: NavigationAction,
}

/// Non-terminal in-call control actions.
///
/// These flow through the general control queue, deliberately separate from
/// the hangup queue so a pending transfer or navigation can never delay or
/// reorder a termination.
#[derive(Debug)]
pub enum ControlEvent {
    /// Attempt IVR navigation; `ack` reports actuation success to the sender
    Navigate {
        command: NavigationCommand,
        ack: Option<oneshot::Sender<bool>>,
    },
    /// Hand the call to a human agent
    Transfer { call_id: String, target: String },
}
