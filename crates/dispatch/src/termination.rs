//! Call termination coordination
//!
//! Single consumer of the hangup queue. The consumer loop is the one dedup
//! point: the first event for a call id claims it, repeats are no-ops. The
//! grace wait and actuation then run in a per-call task, so one call's grace
//! period never delays another call's hangup.
//!
//! A failed actuation marks the call degraded instead of retrying; the
//! telephony side will reap the room on its own inactivity timeout. The
//! external reconciler drains the degraded set via `take_degraded`.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use dialer_core::{HangupEvent, HangupReason, TelephonyControl};

pub struct CallTerminationCoordinator {
    telephony: Arc<dyn TelephonyControl>,
    grace: Duration,
    /// How long a processed call id is remembered for dedup. Duplicates only
    /// race within a call's lifetime, so entries can be dropped afterwards.
    retention: Duration,
    /// Calls a hangup has already been claimed for (idempotency)
    processed: DashMap<String, HangupReason>,
    /// Calls whose hangup actuation failed, pending reconciliation
    degraded: DashMap<String, HangupReason>,
}

impl CallTerminationCoordinator {
    pub fn new(
        telephony: Arc<dyn TelephonyControl>,
        grace: Duration,
        retention: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            telephony,
            grace,
            retention,
            processed: DashMap::new(),
            degraded: DashMap::new(),
        })
    }

    /// Run the consumer loop until the bus is dropped
    pub fn spawn(self: Arc<Self>, mut rx: mpsc::Receiver<HangupEvent>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                // First event wins; repeats for the same call are no-ops
                if self
                    .processed
                    .insert(event.call_id.clone(), event.reason)
                    .is_some()
                {
                    tracing::debug!(call_id = %event.call_id, "Duplicate hangup event, ignoring");
                    continue;
                }

                tracing::info!(
                    call_id = %event.call_id,
                    reason = event.reason.as_str(),
                    callback_scheduled = event.callback_scheduled,
                    grace_ms = self.grace.as_millis() as u64,
                    "Terminating call after grace period"
                );

                // Grace wait and actuation must not block the dedup loop
                let this = self.clone();
                tokio::spawn(async move {
                    this.actuate(event).await;
                });
            }
            tracing::debug!("Hangup queue closed, coordinator exiting");
        })
    }

    async fn actuate(&self, event: HangupEvent) {
        if !self.grace.is_zero() {
            tokio::time::sleep(self.grace).await;
        }

        match self
            .telephony
            .hangup(&event.call_id, event.reason.as_str())
            .await
        {
            Ok(()) => {
                tracing::info!(call_id = %event.call_id, "Call terminated");
            },
            Err(e) => {
                tracing::warn!(
                    call_id = %event.call_id,
                    error = %e,
                    "Hangup actuation failed, marking call degraded"
                );
                self.degraded.insert(event.call_id.clone(), event.reason);
            },
        }

        tokio::time::sleep(self.retention).await;
        self.processed.remove(&event.call_id);
    }

    /// Whether a hangup is currently claimed for this call
    pub fn was_processed(&self, call_id: &str) -> bool {
        self.processed.contains_key(call_id)
    }

    /// Whether this call's hangup actuation failed
    pub fn is_degraded(&self, call_id: &str) -> bool {
        self.degraded.contains_key(call_id)
    }

    /// Drain the degraded set for external reconciliation.
    ///
    /// Entries are removed; a reconciler that fails to act on them must
    /// track them itself.
    pub fn take_degraded(&self) -> Vec<(String, HangupReason)> {
        let keys: Vec<String> = self.degraded.iter().map(|e| e.key().clone()).collect();
        keys.into_iter()
            .filter_map(|k| self.degraded.remove(&k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use async_trait::async_trait;
    use dialer_core::{NavigationCommand, TelephonyError};
    use parking_lot::Mutex;
    use std::time::Instant;

    struct RecordingTelephony {
        hangups: Mutex<Vec<(String, String, Instant)>>,
        fail: bool,
    }

    impl RecordingTelephony {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                hangups: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl TelephonyControl for RecordingTelephony {
        async fn hangup(&self, call_id: &str, reason: &str) -> Result<(), TelephonyError> {
            self.hangups
                .lock()
                .push((call_id.to_string(), reason.to_string(), Instant::now()));
            if self.fail {
                Err(TelephonyError::Api("simulated".into()))
            } else {
                Ok(())
            }
        }

        async fn navigate(&self, _command: &NavigationCommand) -> Result<(), TelephonyError> {
            Ok(())
        }
    }

    fn hangup_event(call_id: &str) -> HangupEvent {
        HangupEvent {
            call_id: call_id.into(),
            reason: HangupReason::AnsweringMachine,
            callback_scheduled: true,
        }
    }

    const LONG_RETENTION: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_duplicate_hangups_actuate_once() {
        let telephony = RecordingTelephony::new(false);
        let (bus, receivers) = EventBus::new(8);
        let coordinator =
            CallTerminationCoordinator::new(telephony.clone(), Duration::ZERO, LONG_RETENTION);
        coordinator.clone().spawn(receivers.hangup_rx);

        bus.publish_hangup(hangup_event("call-1")).await;
        bus.publish_hangup(hangup_event("call-1")).await;
        bus.publish_hangup(hangup_event("call-1")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(telephony.hangups.lock().len(), 1);
        assert!(coordinator.was_processed("call-1"));
    }

    #[tokio::test]
    async fn test_grace_period_delays_actuation() {
        let telephony = RecordingTelephony::new(false);
        let (bus, receivers) = EventBus::new(8);
        let coordinator = CallTerminationCoordinator::new(
            telephony.clone(),
            Duration::from_millis(200),
            LONG_RETENTION,
        );
        coordinator.spawn(receivers.hangup_rx);

        let start = Instant::now();
        bus.publish_hangup(hangup_event("call-1")).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(telephony.hangups.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let hangups = telephony.hangups.lock();
        assert_eq!(hangups.len(), 1);
        assert_eq!(hangups[0].1, "answering_machine");
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_grace_periods_run_concurrently_across_calls() {
        let telephony = RecordingTelephony::new(false);
        let (bus, receivers) = EventBus::new(8);
        let coordinator = CallTerminationCoordinator::new(
            telephony.clone(),
            Duration::from_millis(300),
            LONG_RETENTION,
        );
        coordinator.spawn(receivers.hangup_rx);

        let start = Instant::now();
        bus.publish_hangup(hangup_event("call-1")).await;
        bus.publish_hangup(hangup_event("call-2")).await;
        bus.publish_hangup(hangup_event("call-3")).await;

        tokio::time::sleep(Duration::from_millis(500)).await;

        // All three waited their own grace in parallel, not 3 x 300ms
        let hangups = telephony.hangups.lock();
        assert_eq!(hangups.len(), 3);
        for (_, _, at) in hangups.iter() {
            let elapsed = at.duration_since(start);
            assert!(
                elapsed < Duration::from_millis(450),
                "hangup actuated after {:?}, grace waits were serialized",
                elapsed
            );
        }
    }

    #[tokio::test]
    async fn test_failed_hangup_marks_degraded() {
        let telephony = RecordingTelephony::new(true);
        let (bus, receivers) = EventBus::new(8);
        let coordinator =
            CallTerminationCoordinator::new(telephony.clone(), Duration::ZERO, LONG_RETENTION);
        coordinator.clone().spawn(receivers.hangup_rx);

        bus.publish_hangup(hangup_event("call-1")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(coordinator.is_degraded("call-1"));
        // No retry after failure
        assert_eq!(telephony.hangups.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_take_degraded_drains_the_set() {
        let telephony = RecordingTelephony::new(true);
        let (bus, receivers) = EventBus::new(8);
        let coordinator =
            CallTerminationCoordinator::new(telephony, Duration::ZERO, LONG_RETENTION);
        coordinator.clone().spawn(receivers.hangup_rx);

        bus.publish_hangup(hangup_event("call-1")).await;
        bus.publish_hangup(hangup_event("call-2")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut drained = coordinator.take_degraded();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, "call-1");
        assert!(!coordinator.is_degraded("call-1"));
        assert!(coordinator.take_degraded().is_empty());
    }

    #[tokio::test]
    async fn test_processed_entries_evicted_after_retention() {
        let telephony = RecordingTelephony::new(false);
        let (bus, receivers) = EventBus::new(8);
        let coordinator = CallTerminationCoordinator::new(
            telephony.clone(),
            Duration::ZERO,
            Duration::from_millis(100),
        );
        coordinator.clone().spawn(receivers.hangup_rx);

        bus.publish_hangup(hangup_event("call-1")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(coordinator.was_processed("call-1"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!coordinator.was_processed("call-1"));
        // The actuation itself still happened exactly once
        assert_eq!(telephony.hangups.lock().len(), 1);
    }
}
