//! Dual-queue event bus and control execution
//!
//! Hangup events travel on their own queue so a backlog of navigation or
//! transfer work can never delay a termination. Each queue has exactly one
//! consumer: `ControlExecutor` for the control queue and
//! `CallTerminationCoordinator` for the hangup queue.

use std::sync::Arc;
use tokio::sync::mpsc;

use dialer_core::{ControlEvent, HangupEvent, TelephonyControl};

/// Publishing side of the event bus. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    control_tx: mpsc::Sender<ControlEvent>,
    hangup_tx: mpsc::Sender<HangupEvent>,
}

/// Consuming side of the event bus, handed to the two executor loops
pub struct EventBusReceivers {
    pub control_rx: mpsc::Receiver<ControlEvent>,
    pub hangup_rx: mpsc::Receiver<HangupEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, EventBusReceivers) {
        let (control_tx, control_rx) = mpsc::channel(capacity);
        let (hangup_tx, hangup_rx) = mpsc::channel(capacity);
        (
            Self {
                control_tx,
                hangup_tx,
            },
            EventBusReceivers {
                control_rx,
                hangup_rx,
            },
        )
    }

    /// Publish a non-terminal control event.
    ///
    /// A closed consumer is logged and swallowed: the call is already being
    /// torn down and there is nothing useful to propagate.
    pub async fn publish_control(&self, event: ControlEvent) {
        if self.control_tx.send(event).await.is_err() {
            tracing::warn!("Control queue closed, dropping event");
        }
    }

    /// Publish a hangup request
    pub async fn publish_hangup(&self, event: HangupEvent) {
        let call_id = event.call_id.clone();
        if self.hangup_tx.send(event).await.is_err() {
            tracing::warn!(call_id = %call_id, "Hangup queue closed, dropping event");
        }
    }
}

/// Single consumer of the control queue.
///
/// Actuates navigation against telephony and reports per-attempt success
/// back through the event's ack channel.
pub struct ControlExecutor {
    telephony: Arc<dyn TelephonyControl>,
}

impl ControlExecutor {
    pub fn new(telephony: Arc<dyn TelephonyControl>) -> Self {
        Self { telephony }
    }

    /// Run the consumer loop until the bus is dropped
    pub fn spawn(self, mut rx: mpsc::Receiver<ControlEvent>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle(event).await;
            }
            tracing::debug!("Control queue closed, executor exiting");
        })
    }

    async fn handle(&self, event: ControlEvent) {
        match event {
            ControlEvent::Navigate { command, ack } => {
                let success = match self.telephony.navigate(&command).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(
                            call_id = %command.call_id,
                            action = ?command.action,
                            error = %e,
                            "Navigation actuation failed"
                        );
                        false
                    },
                };

                if let Some(ack) = ack {
                    // Requester may have timed out and dropped its receiver
                    let _ = ack.send(success);
                }
            },
            ControlEvent::Transfer { call_id, target } => {
                // Transfer actuation belongs to the conversation layer;
                // the dispatcher only routes the request.
                tracing::info!(call_id = %call_id, target = %target, "Transfer requested");
            },
        }
    }
}
