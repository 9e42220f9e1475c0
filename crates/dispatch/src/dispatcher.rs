//! Classification-to-action mapping
//!
//! The dispatcher is the engine's only `DecisionSink`. It never touches
//! telephony directly: terminations go through the hangup queue and
//! navigation through the control queue, each actuated by its own consumer.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

use dialer_config::DispatchSettings;
use dialer_core::{
    CallSession, ControlEvent, DecisionSink, DecisionState, DetectionResult, HangupEvent,
    HangupReason, NavigationAction, NavigationCommand,
};
use dialer_persistence::{CallOutcome, CallbackScheduler, OutcomeStore};

use crate::bus::EventBus;

pub struct ActionDispatcher {
    bus: EventBus,
    scheduler: Arc<CallbackScheduler>,
    outcomes: Arc<dyn OutcomeStore>,
    settings: DispatchSettings,
}

impl ActionDispatcher {
    pub fn new(
        bus: EventBus,
        scheduler: Arc<CallbackScheduler>,
        outcomes: Arc<dyn OutcomeStore>,
        settings: DispatchSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            scheduler,
            outcomes,
            settings,
        })
    }

    /// Voicemail: schedule a redial, then hang up.
    ///
    /// The hangup goes out even if scheduling fails; keeping an agent
    /// talking to a recording is worse than a missed redial.
    async fn handle_answering_machine(&self, session: &CallSession) {
        let callback_scheduled = match self
            .scheduler
            .schedule(
                &session.lead_id,
                &session.phone_number,
                HangupReason::AnsweringMachine.as_str(),
            )
            .await
        {
            Ok(schedule) => {
                tracing::info!(
                    call_id = %session.call_id,
                    lead_id = %session.lead_id,
                    scheduled_at = %schedule.scheduled_at,
                    attempt_count = schedule.attempt_count,
                    "Voicemail detected, callback scheduled"
                );
                true
            },
            Err(e) => {
                tracing::error!(
                    call_id = %session.call_id,
                    lead_id = %session.lead_id,
                    error = %e,
                    "Callback scheduling failed, hanging up anyway"
                );
                false
            },
        };

        self.bus
            .publish_hangup(HangupEvent {
                call_id: session.call_id.clone(),
                reason: HangupReason::AnsweringMachine,
                callback_scheduled,
            })
            .await;
    }

    /// IVR menu: try to navigate to a human operator; hang up on exhaustion.
    async fn handle_ivr_menu(&self, session: &CallSession) {
        for attempt in 1..=self.settings.max_navigation_attempts {
            if self.try_navigate(session, attempt).await {
                tracing::info!(
                    call_id = %session.call_id,
                    attempt = attempt,
                    "IVR navigation succeeded, waiting for operator"
                );
                return;
            }
        }

        tracing::warn!(
            call_id = %session.call_id,
            attempts = self.settings.max_navigation_attempts,
            "IVR navigation exhausted, hanging up"
        );

        let callback_scheduled = match self
            .scheduler
            .schedule(
                &session.lead_id,
                &session.phone_number,
                HangupReason::IvrMenuTimeout.as_str(),
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    call_id = %session.call_id,
                    error = %e,
                    "Callback scheduling failed after IVR exhaustion"
                );
                false
            },
        };

        self.bus
            .publish_hangup(HangupEvent {
                call_id: session.call_id.clone(),
                reason: HangupReason::IvrMenuTimeout,
                callback_scheduled,
            })
            .await;
    }

    /// One navigation attempt, bounded by the per-attempt timeout
    async fn try_navigate(&self, session: &CallSession, attempt: u32) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();

        self.bus
            .publish_control(ControlEvent::Navigate {
                command: NavigationCommand {
                    call_id: session.call_id.clone(),
                    action: NavigationAction::RequestOperator,
                },
                ack: Some(ack_tx),
            })
            .await;

        match tokio::time::timeout(self.settings.navigation_timeout(), ack_rx).await {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                tracing::warn!(
                    call_id = %session.call_id,
                    attempt = attempt,
                    "Navigation attempt failed"
                );
                false
            },
            Ok(Err(_)) => {
                tracing::warn!(
                    call_id = %session.call_id,
                    attempt = attempt,
                    "Navigation ack dropped"
                );
                false
            },
            Err(_) => {
                tracing::warn!(
                    call_id = %session.call_id,
                    attempt = attempt,
                    timeout_ms = self.settings.navigation_timeout_ms,
                    "Navigation attempt timed out"
                );
                false
            },
        }
    }

    /// Best-effort audit record; never blocks the action path
    async fn record_outcome(&self, session: &CallSession, result: DetectionResult) {
        let source = match session.decision {
            DecisionState::Decided { source, .. } => format!("{:?}", source),
            DecisionState::Collecting => "unknown".to_string(),
        };

        let outcome = CallOutcome {
            outcome_id: Uuid::new_v4(),
            call_id: session.call_id.clone(),
            lead_id: session.lead_id.clone(),
            phone_number: session.phone_number.clone(),
            result: result.as_str().to_string(),
            source,
            transcript: session.transcript.clone(),
            connected_at: session.connected_at_utc,
            decided_at: chrono::Utc::now(),
        };

        if let Err(e) = self.outcomes.record(&outcome).await {
            tracing::warn!(
                call_id = %session.call_id,
                error = %e,
                "Failed to record call outcome"
            );
        }
    }
}

#[async_trait]
impl DecisionSink for ActionDispatcher {
    async fn on_decision(&self, session: &CallSession, result: DetectionResult) {
        self.record_outcome(session, result).await;

        match result {
            DetectionResult::LivePerson => {
                tracing::info!(
                    call_id = %session.call_id,
                    "Live person, conversation continues"
                );
            },
            DetectionResult::AutomatedGatekeeper => {
                // The conversation layer answers the gatekeeper's questions;
                // no dispatch action is needed.
                tracing::info!(
                    call_id = %session.call_id,
                    "Automated gatekeeper, conversation continues"
                );
            },
            DetectionResult::AnsweringMachine => {
                self.handle_answering_machine(session).await;
            },
            DetectionResult::IvrMenu => {
                self.handle_ivr_menu(session).await;
            },
            DetectionResult::Unknown => {
                tracing::debug!(
                    call_id = %session.call_id,
                    "Inconclusive result reached dispatcher, ignoring"
                );
            },
        }
    }
}
