//! Recording toggle controller.
//!
//! The one piece of real logic on the screen: a two-state toggle that wires
//! the recorder's chunk subscription into the speech engine on the way up,
//! and tears everything down symmetrically on the way down. The engine's
//! stream-start is spawned unawaited; its result comes back as an event
//! tagged with a session token, and a stale result is discarded.

use anyhow::Result;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use super::pulse::PulseAnimation;
use super::state::{RecordingState, SessionCounter, SessionToken};
use crate::audio::{BufferSubscription, CaptureSource};
use crate::engine::TranscriptionEngine;

/// Deferred result of an unawaited session operation.
enum SessionEvent {
    StreamStarted {
        token: SessionToken,
        result: Result<()>,
    },
}

/// Drives the Idle/Recording state machine for the live screen.
pub struct RecordingController<A: CaptureSource> {
    state: RecordingState,
    recorder: A,
    engine: TranscriptionEngine,
    subscription: Option<BufferSubscription>,
    pulse: PulseAnimation,
    sessions: SessionCounter,
    recording_since: Option<Instant>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
}

impl<A: CaptureSource> RecordingController<A> {
    pub fn new(recorder: A, engine: TranscriptionEngine) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            state: RecordingState::Idle,
            recorder,
            engine,
            subscription: None,
            pulse: PulseAnimation::new(),
            sessions: SessionCounter::new(),
            recording_since: None,
            events_tx,
            events_rx,
        }
    }

    /// Current recording state.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Current microphone indicator scale.
    pub fn pulse_scale(&self) -> f32 {
        self.pulse.scale()
    }

    /// How long the current recording has been running.
    pub fn recording_elapsed(&self) -> Option<Duration> {
        self.recording_since.map(|s| s.elapsed())
    }

    /// Borrows the capture source, e.g. for the level display.
    pub fn recorder(&self) -> &A {
        &self.recorder
    }

    /// Flips between Idle and Recording; returns the new state.
    pub fn toggle(&mut self) -> RecordingState {
        match self.state {
            RecordingState::Idle => self.begin(),
            RecordingState::Recording => self.end(),
        }
        self.state
    }

    /// Applies deferred session events. Returns true if the state was forced
    /// back to Idle by a failed stream-start.
    pub fn poll(&mut self) -> bool {
        let mut forced_stop = false;
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SessionEvent::StreamStarted { token, result } => {
                    if token != self.sessions.current() || self.state == RecordingState::Idle {
                        tracing::debug!("Discarding stale stream-start result");
                        continue;
                    }
                    if let Err(e) = result {
                        // The only error path: reconcile back to Idle exactly
                        // as if the user had stopped manually.
                        tracing::warn!("Streaming session failed to start: {e:#}");
                        self.end();
                        forced_stop = true;
                    }
                }
            }
        }
        forced_stop
    }

    fn begin(&mut self) {
        let token = self.sessions.next();
        self.state = RecordingState::Recording;
        self.recording_since = Some(Instant::now());
        self.pulse.start();

        // Wire chunks into the engine before capture starts so the first
        // buffer is never dropped.
        let engine = self.engine.clone();
        let subscription = self
            .recorder
            .subscribe(Box::new(move |chunk| engine.stream_insert(chunk)));
        self.subscription = Some(subscription);

        if let Err(e) = self.recorder.start() {
            tracing::warn!("Failed to start capture: {e:#}");
            self.end();
            return;
        }

        let engine = self.engine.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = engine.stream().await;
            let _ = events.send(SessionEvent::StreamStarted { token, result });
        });

        tracing::info!("Recording started (session {:?})", token);
    }

    fn end(&mut self) {
        self.state = RecordingState::Idle;
        self.recording_since = None;
        self.pulse.stop();

        // Release the subscription before stopping capture so no chunk can
        // be delivered into a stream that has logically ended.
        self.subscription = None;
        self.recorder.stop();
        self.engine.stream_stop();

        tracing::info!("Recording stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::recorder::{BufferSubscription, ChunkHandler};
    use crate::engine::{SpeechModel, StreamSettings, TranscriptionEngine};
    use std::sync::{Arc, Mutex};

    /// Backend that hears nothing; the controller tests only exercise wiring.
    struct NullModel;

    impl SpeechModel for NullModel {
        fn transcribe(&mut self, _samples: &[f32]) -> Result<String> {
            Ok(String::new())
        }
    }

    #[derive(Clone, Default)]
    struct CallLog(Arc<Mutex<Vec<&'static str>>>);

    impl CallLog {
        fn record(&self, call: &'static str) {
            self.0.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }

        fn count(&self, call: &'static str) -> usize {
            self.0.lock().unwrap().iter().filter(|c| **c == call).count()
        }
    }

    struct FakeSource {
        log: CallLog,
        slot: Arc<Mutex<Option<ChunkHandler>>>,
    }

    impl FakeSource {
        fn new(log: CallLog) -> Self {
            Self {
                log,
                slot: Arc::new(Mutex::new(None)),
            }
        }

        fn has_handler(&self) -> bool {
            self.slot.lock().unwrap().is_some()
        }
    }

    impl CaptureSource for FakeSource {
        fn subscribe(&mut self, handler: ChunkHandler) -> BufferSubscription {
            self.log.record("subscribe");
            *self.slot.lock().unwrap() = Some(handler);
            BufferSubscription::new(Arc::clone(&self.slot))
        }

        fn start(&mut self) -> Result<()> {
            self.log.record("start");
            Ok(())
        }

        fn stop(&mut self) {
            self.log.record("stop");
        }
    }

    fn ready_engine() -> TranscriptionEngine {
        let settings = StreamSettings {
            sample_rate: 16000,
            window_samples: 64,
            decode_stride: 4,
            stable_decodes: 2,
            silence_rms: 0.001,
            max_pending_words: 8,
            silence_commit_streak: 2,
        };
        TranscriptionEngine::with_decoder(Box::new(NullModel), settings).0
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn toggle_from_idle_starts_capture_and_stream_once() {
        let log = CallLog::default();
        let engine = ready_engine();
        let mut controller = RecordingController::new(FakeSource::new(log.clone()), engine.clone());

        assert_eq!(controller.toggle(), RecordingState::Recording);
        wait_for(|| engine.streams_started() == 1).await;

        // Handler registered strictly before capture started
        assert_eq!(log.calls(), vec!["subscribe", "start"]);
        assert!(controller.recorder().has_handler());
        assert!(controller.pulse.is_active());
        assert_eq!(engine.streams_started(), 1);
    }

    #[tokio::test]
    async fn toggle_from_recording_stops_everything_once() {
        let log = CallLog::default();
        let engine = ready_engine();
        let mut controller = RecordingController::new(FakeSource::new(log.clone()), engine.clone());

        controller.toggle();
        wait_for(|| engine.is_streaming()).await;

        assert_eq!(controller.toggle(), RecordingState::Idle);
        assert_eq!(log.count("stop"), 1);
        assert!(!engine.is_streaming(), "stream_stop signaled");
        assert!(!controller.recorder().has_handler(), "subscription released");
        assert_eq!(controller.pulse_scale(), 1.0);
    }

    #[tokio::test]
    async fn rejected_stream_start_forces_idle() {
        let log = CallLog::default();
        let engine = ready_engine();
        // Occupy the engine so the controller's spawned stream() is rejected
        engine.stream().await.unwrap();

        let mut controller = RecordingController::new(FakeSource::new(log.clone()), engine.clone());
        controller.toggle();
        assert_eq!(controller.state(), RecordingState::Recording);

        // The failure arrives as a deferred event and reconciles state
        for _ in 0..100 {
            if controller.poll() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(log.count("stop"), 1);
        assert_eq!(controller.pulse_scale(), 1.0);
    }

    #[tokio::test]
    async fn stale_stream_result_is_discarded() {
        let log = CallLog::default();
        let engine = ready_engine();
        let mut controller = RecordingController::new(FakeSource::new(log.clone()), engine.clone());

        let stale = controller.sessions.current();
        controller.toggle();
        wait_for(|| engine.streams_started() == 1).await;

        // A failure from a session that is no longer current must not
        // disturb the live one.
        controller
            .events_tx
            .send(SessionEvent::StreamStarted {
                token: stale,
                result: Err(anyhow::anyhow!("late failure")),
            })
            .unwrap();

        assert!(!controller.poll());
        assert_eq!(controller.state(), RecordingState::Recording);
        assert_eq!(log.count("stop"), 0);
    }

    #[tokio::test]
    async fn current_token_failure_reconciles() {
        let log = CallLog::default();
        let engine = ready_engine();
        let mut controller = RecordingController::new(FakeSource::new(log.clone()), engine.clone());

        controller.toggle();
        let current = controller.sessions.current();
        controller
            .events_tx
            .send(SessionEvent::StreamStarted {
                token: current,
                result: Err(anyhow::anyhow!("model rejected the stream")),
            })
            .unwrap();

        assert!(controller.poll());
        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(log.count("stop"), 1);
    }

    #[tokio::test]
    async fn failed_capture_start_reconciles_immediately() {
        struct BrokenSource {
            log: CallLog,
        }

        impl CaptureSource for BrokenSource {
            fn subscribe(&mut self, _handler: ChunkHandler) -> BufferSubscription {
                self.log.record("subscribe");
                BufferSubscription::new(Arc::new(Mutex::new(None)))
            }

            fn start(&mut self) -> Result<()> {
                self.log.record("start");
                Err(anyhow::anyhow!("no input device"))
            }

            fn stop(&mut self) {
                self.log.record("stop");
            }
        }

        let log = CallLog::default();
        let engine = ready_engine();
        let mut controller =
            RecordingController::new(BrokenSource { log: log.clone() }, engine.clone());

        assert_eq!(controller.toggle(), RecordingState::Idle);
        assert_eq!(controller.pulse_scale(), 1.0);
        assert!(!engine.is_streaming());
    }
}
