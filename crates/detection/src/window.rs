//! Detection window controller
//!
//! One controller per outbound call. Aggregates keyword, cadence, and tone
//! signals over a bounded window and produces exactly one final
//! classification, handed to the injected `DecisionSink`.
//!
//! State machine: `Collecting -> Decided` on the first conclusive signal, or
//! `Collecting -> Expired -> Decided(LivePerson)` when the window elapses
//! (fail-open: an unclassified answer is assumed to be a real human rather
//! than silently dropped).

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use dialer_config::DetectionSettings;
use dialer_core::{
    AudioFrame, CallSession, DecisionSink, DecisionSource, DecisionState, DetectionResult,
    Speaker, TranscriptSegment,
};

use crate::{ToneDetector, TranscriptClassifier};

/// Internal per-call tracking, serialized behind one lock.
///
/// The lock is what upholds the one-shot invariant: a late transcript, a
/// late audio frame, and the expiry timer all contend on it, and only the
/// first to find `Collecting` gets to decide.
struct WindowState {
    session: CallSession,
    /// Timestamp of the first final callee segment (ms since connect)
    speech_start_ms: Option<u64>,
    /// Timestamp of the most recent final callee segment
    last_segment_ms: Option<u64>,
    /// Natural gaps observed between callee segments
    pause_count: u32,
}

/// Read-only view of a controller's current state, for logging and tests
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub call_id: String,
    pub decision: DecisionState,
    pub transcript: String,
    pub pause_count: u32,
}

/// Per-call decision state machine.
pub struct DetectionWindowController {
    settings: DetectionSettings,
    classifier: Arc<TranscriptClassifier>,
    tone: Arc<ToneDetector>,
    sink: Arc<dyn DecisionSink>,
    state: Mutex<WindowState>,
}

impl DetectionWindowController {
    pub fn new(
        session: CallSession,
        settings: DetectionSettings,
        classifier: Arc<TranscriptClassifier>,
        tone: Arc<ToneDetector>,
        sink: Arc<dyn DecisionSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            classifier,
            tone,
            sink,
            state: Mutex::new(WindowState {
                session,
                speech_start_ms: None,
                last_segment_ms: None,
                pause_count: 0,
            }),
        })
    }

    /// Arm the detection-window expiry timer.
    ///
    /// The timer task holds only a weak handle; if the call ends and the
    /// controller is dropped first, expiry is a no-op.
    pub fn start(self: &Arc<Self>) {
        let remaining = {
            let state = self.state.lock();
            self.settings
                .detection_window()
                .saturating_sub(state.session.connected_at.elapsed())
        };

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            if let Some(controller) = weak.upgrade() {
                controller.on_window_expired().await;
            }
        });
    }

    /// Feed a transcript segment into the window.
    pub async fn on_transcript(&self, segment: TranscriptSegment) {
        let decided = {
            let mut state = self.state.lock();

            if state.session.decision.is_decided() {
                tracing::debug!(
                    call_id = %state.session.call_id,
                    "Transcript after decision, ignoring"
                );
                return;
            }

            // Agent-side speech never feeds classification
            if segment.speaker == Speaker::Agent {
                return;
            }

            if segment.is_final {
                // Pause tracking from inter-segment gaps
                if let Some(last) = state.last_segment_ms {
                    let gap = segment.timestamp_ms.saturating_sub(last);
                    if gap >= self.settings.pause_gap_ms {
                        state.pause_count += 1;
                    }
                }
                if state.speech_start_ms.is_none() {
                    state.speech_start_ms = Some(segment.timestamp_ms);
                }
                state.last_segment_ms = Some(segment.timestamp_ms);
                let text = segment.text.clone();
                state.session.append_transcript(&text);
            }

            // Classify accumulated text, including a non-final tail if present
            let text = if segment.is_final {
                state.session.transcript.clone()
            } else if state.session.transcript.is_empty() {
                segment.text.clone()
            } else {
                format!("{} {}", state.session.transcript, segment.text)
            };

            let keyword = self.gate_ivr(self.classifier.classify(&text));
            if keyword.is_conclusive() {
                self.decide_locked(&mut state, keyword, DecisionSource::Keyword)
            } else {
                let duration = self.speech_duration(&state);
                let timing = self.gate_ivr(TranscriptClassifier::classify_by_timing(
                    duration,
                    state.pause_count,
                ));
                if timing.is_conclusive() {
                    self.decide_locked(&mut state, timing, DecisionSource::Timing)
                } else {
                    None
                }
            }
        };

        if let Some((session, result)) = decided {
            self.sink.on_decision(&session, result).await;
        }
    }

    /// Feed an audio frame into the window.
    ///
    /// A detected beep forces `AnsweringMachine` regardless of any other
    /// signal: the tone is treated as the strongest single signal.
    pub async fn on_audio(&self, frame: AudioFrame) {
        // Tone analysis runs outside the session lock; the detector is
        // stateless and the frame is consumed once.
        let beep = {
            if self.state.lock().session.decision.is_decided() {
                return;
            }
            self.tone.detect_beep(&frame)
        };

        if !beep {
            return;
        }

        let decided = {
            let mut state = self.state.lock();
            self.decide_locked(
                &mut state,
                DetectionResult::AnsweringMachine,
                DecisionSource::Tone,
            )
        };

        if let Some((session, result)) = decided {
            self.sink.on_decision(&session, result).await;
        }
    }

    /// Fail-open expiry: no conclusive signal means we assume a live person.
    async fn on_window_expired(&self) {
        let decided = {
            let mut state = self.state.lock();
            if state.session.decision.is_decided() {
                tracing::debug!(
                    call_id = %state.session.call_id,
                    "Window expired after decision, no-op"
                );
                return;
            }

            tracing::info!(
                call_id = %state.session.call_id,
                window_s = self.settings.detection_window_seconds,
                "Detection window expired without conclusive signal"
            );

            self.decide_locked(
                &mut state,
                DetectionResult::LivePerson,
                DecisionSource::WindowExpired,
            )
        };

        if let Some((session, result)) = decided {
            self.sink.on_decision(&session, result).await;
        }
    }

    /// One-shot check-and-set. Returns the frozen session snapshot exactly
    /// once; every later caller gets None.
    fn decide_locked(
        &self,
        state: &mut WindowState,
        result: DetectionResult,
        source: DecisionSource,
    ) -> Option<(CallSession, DetectionResult)> {
        debug_assert!(result.is_conclusive());

        if state.session.decision.is_decided() {
            return None;
        }

        state.session.decision = DecisionState::Decided { result, source };

        tracing::info!(
            call_id = %state.session.call_id,
            lead_id = %state.session.lead_id,
            result = %result,
            source = ?source,
            elapsed_ms = state.session.connected_at.elapsed().as_millis() as u64,
            "Call classified"
        );

        Some((state.session.clone(), result))
    }

    fn gate_ivr(&self, result: DetectionResult) -> DetectionResult {
        if result == DetectionResult::IvrMenu && !self.settings.ivr_detection_enabled {
            DetectionResult::Unknown
        } else {
            result
        }
    }

    fn speech_duration(&self, state: &WindowState) -> Duration {
        match (state.speech_start_ms, state.last_segment_ms) {
            (Some(start), Some(last)) if last > start => Duration::from_millis(last - start),
            _ => Duration::ZERO,
        }
    }

    /// Current state snapshot
    pub fn snapshot(&self) -> WindowSnapshot {
        let state = self.state.lock();
        WindowSnapshot {
            call_id: state.session.call_id.clone(),
            decision: state.session.decision,
            transcript: state.session.transcript.clone(),
            pause_count: state.pause_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dialer_core::SampleRate;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink that records every decision it receives
    #[derive(Default)]
    struct RecordingSink {
        decisions: PlMutex<Vec<(String, DetectionResult)>>,
        count: AtomicUsize,
    }

    #[async_trait]
    impl DecisionSink for RecordingSink {
        async fn on_decision(&self, session: &CallSession, result: DetectionResult) {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.decisions
                .lock()
                .push((session.call_id.clone(), result));
        }
    }

    fn controller_with(
        settings: DetectionSettings,
        sink: Arc<RecordingSink>,
    ) -> Arc<DetectionWindowController> {
        let classifier = Arc::new(TranscriptClassifier::new(Default::default()));
        let tone = Arc::new(ToneDetector::new(&settings));
        DetectionWindowController::new(
            CallSession::new("call-1", "lead-1", "+15550100"),
            settings,
            classifier,
            tone,
            sink,
        )
    }

    fn beep_frame() -> AudioFrame {
        let samples: Vec<f32> = (0..4000)
            .map(|i| 0.8 * (2.0 * std::f32::consts::PI * 900.0 * i as f32 / 8000.0).sin())
            .collect();
        AudioFrame::new(samples, SampleRate::Hz8000, 0)
    }

    #[tokio::test]
    async fn test_keyword_decision_freezes() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(DetectionSettings::default(), sink.clone());

        controller
            .on_transcript(TranscriptSegment::callee(
                "Please leave a message after the beep",
                500,
            ))
            .await;

        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::AnsweringMachine)
        );

        // A later live-sounding segment must not change the frozen result
        controller
            .on_transcript(TranscriptSegment::callee("Hello? Who is this?", 2000))
            .await;

        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::AnsweringMachine)
        );
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tone_forces_answering_machine() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(DetectionSettings::default(), sink.clone());

        controller.on_audio(beep_frame()).await;

        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::AnsweringMachine)
        );
        let decisions = sink.decisions.lock();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].1, DetectionResult::AnsweringMachine);
    }

    #[tokio::test]
    async fn test_audio_after_decision_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(DetectionSettings::default(), sink.clone());

        controller
            .on_transcript(TranscriptSegment::callee("Hello? Who is this?", 300))
            .await;
        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::LivePerson)
        );

        controller.on_audio(beep_frame()).await;

        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::LivePerson)
        );
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_window_expiry_fails_open_to_live_person() {
        let mut settings = DetectionSettings::default();
        settings.detection_window_seconds = 1;
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(settings, sink.clone());

        controller.start();
        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::LivePerson)
        );
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_after_decision_is_noop() {
        let mut settings = DetectionSettings::default();
        settings.detection_window_seconds = 1;
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(settings, sink.clone());

        controller.start();
        controller
            .on_transcript(TranscriptSegment::callee("press 1 for sales", 200))
            .await;
        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::IvrMenu)
        );

        tokio::time::sleep(Duration::from_millis(1200)).await;

        // Timer fired but the earlier decision stands, invoked once only
        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::IvrMenu)
        );
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ivr_detection_can_be_disabled() {
        let mut settings = DetectionSettings::default();
        settings.ivr_detection_enabled = false;
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(settings, sink.clone());

        controller
            .on_transcript(TranscriptSegment::callee("press 1 for sales", 200))
            .await;

        assert_eq!(controller.snapshot().decision, DecisionState::Collecting);
        assert_eq!(sink.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_agent_speech_does_not_classify() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(DetectionSettings::default(), sink.clone());

        controller
            .on_transcript(TranscriptSegment::new(
                Speaker::Agent,
                "please leave a message after the beep",
                true,
                400,
            ))
            .await;

        assert_eq!(controller.snapshot().decision, DecisionState::Collecting);
        assert!(controller.snapshot().transcript.is_empty());
    }

    #[tokio::test]
    async fn test_timing_heuristic_pause_tracking() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(DetectionSettings::default(), sink.clone());

        // Two short neutral segments separated by a natural pause
        controller
            .on_transcript(TranscriptSegment::callee("uh hold on", 500))
            .await;
        controller
            .on_transcript(TranscriptSegment::callee("one moment", 2500))
            .await;

        // 2s of speech, 1 pause -> LivePerson via the cadence heuristic
        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::LivePerson)
        );
        assert_eq!(controller.snapshot().pause_count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_signals_decide_once() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller_with(DetectionSettings::default(), sink.clone());

        let mut handles = Vec::new();
        for i in 0..8 {
            let c = controller.clone();
            handles.push(tokio::spawn(async move {
                c.on_transcript(TranscriptSegment::callee(
                    "press 1 for sales",
                    100 + i as u64,
                ))
                .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
        assert_eq!(
            controller.snapshot().decision.result(),
            Some(DetectionResult::IvrMenu)
        );
    }
}
