//! On-device streaming speech recognition engine.
//!
//! The [`TranscriptionEngine`] is a single long-lived handle over the whole
//! speech stack: model download with progress, off-thread model loading, and
//! streaming sessions that accept audio chunks and emit committed/tentative
//! transcript updates. The screen polls the update channel and queries the
//! readiness/progress getters each frame.

pub mod catalog;
pub mod decoder;
pub mod download;
mod stream;

pub use catalog::EngineModel;
pub use decoder::{SpeechModel, WhisperModel};
pub use stream::StreamSettings;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};

/// Notification from the engine to the screen. Polled, never pushed.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    /// Model download progressed; fraction in [0, 1]
    DownloadProgress(f32),
    /// Model is loaded and streaming can start
    Ready,
    /// Model download or load failed; the engine stays non-ready
    Failed(String),
    /// Transcript increment the engine will not revise; append it
    Committed(String),
    /// Full replacement for the in-flight hypothesis
    Tentative(String),
}

/// Engine lifecycle phase.
#[derive(Debug, Clone)]
enum EnginePhase {
    Downloading { progress: f32 },
    Loading,
    Ready,
    Failed { message: String },
}

/// An active streaming session. Dropping the sender ends the worker.
struct StreamSession {
    chunk_tx: mpsc::Sender<Vec<f32>>,
}

struct EngineInner {
    phase: Mutex<EnginePhase>,
    settings: StreamSettings,
    decoder: Mutex<Option<Box<dyn SpeechModel>>>,
    session: Mutex<Option<StreamSession>>,
    updates: Sender<EngineUpdate>,
    streams_started: AtomicU64,
    chunks_inserted: AtomicU64,
}

impl EngineInner {
    fn set_phase(&self, phase: EnginePhase) {
        *self.phase.lock().unwrap() = phase;
    }
}

/// Long-lived handle to the streaming speech-to-text engine.
///
/// Cheap to clone; clones share the same engine.
#[derive(Clone)]
pub struct TranscriptionEngine {
    inner: Arc<EngineInner>,
}

impl TranscriptionEngine {
    /// Creates an engine for the given catalog model and immediately begins
    /// preparing it in the background: download (if needed), then load.
    ///
    /// Returns the handle and the update channel the screen polls.
    pub fn new(
        model: EngineModel,
        models_dir: PathBuf,
        settings: StreamSettings,
    ) -> (Self, Receiver<EngineUpdate>) {
        let (updates, updates_rx) = mpsc::channel();
        let inner = Arc::new(EngineInner {
            phase: Mutex::new(EnginePhase::Downloading { progress: 0.0 }),
            settings,
            decoder: Mutex::new(None),
            session: Mutex::new(None),
            updates,
            streams_started: AtomicU64::new(0),
            chunks_inserted: AtomicU64::new(0),
        });

        tokio::spawn(prepare(Arc::clone(&inner), model, models_dir));

        (Self { inner }, updates_rx)
    }

    /// Creates an engine over an already-loaded model backend.
    ///
    /// The engine is ready immediately; no download or load happens. Used to
    /// plug in custom backends, and by unit tests to substitute fakes.
    pub fn with_decoder(
        decoder: Box<dyn SpeechModel>,
        settings: StreamSettings,
    ) -> (Self, Receiver<EngineUpdate>) {
        let (updates, updates_rx) = mpsc::channel();
        let inner = Arc::new(EngineInner {
            phase: Mutex::new(EnginePhase::Ready),
            settings,
            decoder: Mutex::new(Some(decoder)),
            session: Mutex::new(None),
            updates,
            streams_started: AtomicU64::new(0),
            chunks_inserted: AtomicU64::new(0),
        });
        (Self { inner }, updates_rx)
    }

    /// Returns whether the model is loaded and streaming can start.
    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.phase.lock().unwrap(), EnginePhase::Ready)
    }

    /// Returns the model download progress as a fraction in [0, 1].
    ///
    /// Reports 1.0 once downloading is past (loading, ready, or failed).
    pub fn download_progress(&self) -> f32 {
        match *self.inner.phase.lock().unwrap() {
            EnginePhase::Downloading { progress } => progress,
            _ => 1.0,
        }
    }

    /// Returns the failure message if the engine gave up preparing.
    pub fn failure(&self) -> Option<String> {
        match &*self.inner.phase.lock().unwrap() {
            EnginePhase::Failed { message } => Some(message.clone()),
            _ => None,
        }
    }

    /// Begins a streaming session.
    ///
    /// # Errors
    /// - If the engine is not ready
    /// - If a streaming session is already active
    /// - If the session worker thread cannot be spawned
    pub async fn stream(&self) -> Result<()> {
        if !self.is_ready() {
            anyhow::bail!("Speech engine is not ready");
        }

        let mut session = self.inner.session.lock().unwrap();
        if session.is_some() {
            anyhow::bail!("A streaming session is already active");
        }

        let (chunk_tx, chunk_rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        std::thread::Builder::new()
            .name("sotto-stream".to_string())
            .spawn(move || {
                stream::run_stream(&inner.decoder, &inner.settings, chunk_rx, &inner.updates);
            })?;

        *session = Some(StreamSession { chunk_tx });
        self.inner.streams_started.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Streaming session started");
        Ok(())
    }

    /// Hands one audio chunk to the active streaming session.
    ///
    /// Inert when no session is active; a late chunk from a stopped session
    /// is dropped, not an error.
    pub fn stream_insert(&self, samples: &[f32]) {
        let session = self.inner.session.lock().unwrap();
        match session.as_ref() {
            Some(s) => {
                if s.chunk_tx.send(samples.to_vec()).is_ok() {
                    self.inner.chunks_inserted.fetch_add(1, Ordering::Relaxed);
                }
            }
            None => {
                tracing::debug!("Audio chunk dropped: no active streaming session");
            }
        }
    }

    /// Signals end-of-stream to the active session.
    ///
    /// The worker commits whatever is still pending and exits; the caller
    /// does not wait for it. Inert when no session is active.
    pub fn stream_stop(&self) {
        if self.inner.session.lock().unwrap().take().is_some() {
            tracing::info!("End of stream signaled");
        }
    }

    /// Returns whether a streaming session is currently active.
    pub fn is_streaming(&self) -> bool {
        self.inner.session.lock().unwrap().is_some()
    }

    /// Total streaming sessions started on this engine.
    pub fn streams_started(&self) -> u64 {
        self.inner.streams_started.load(Ordering::Relaxed)
    }

    /// Total chunks accepted by streaming sessions on this engine.
    pub fn chunks_inserted(&self) -> u64 {
        self.inner.chunks_inserted.load(Ordering::Relaxed)
    }
}

/// Background preparation: download the model if needed, then load it.
async fn prepare(inner: Arc<EngineInner>, model: EngineModel, models_dir: PathBuf) {
    let _ = inner.updates.send(EngineUpdate::DownloadProgress(0.0));

    let downloaded = download::ensure_model(&model, &models_dir, |progress| {
        inner.set_phase(EnginePhase::Downloading { progress });
        let _ = inner.updates.send(EngineUpdate::DownloadProgress(progress));
    })
    .await;

    let model_path = match downloaded {
        Ok(path) => path,
        Err(e) => {
            fail(&inner, format!("Model download failed: {e:#}"));
            return;
        }
    };

    inner.set_phase(EnginePhase::Loading);
    let language = model.language();
    let loaded =
        tokio::task::spawn_blocking(move || WhisperModel::load(&model_path, language)).await;

    match loaded {
        Ok(Ok(decoder)) => {
            *inner.decoder.lock().unwrap() = Some(Box::new(decoder));
            inner.set_phase(EnginePhase::Ready);
            let _ = inner.updates.send(EngineUpdate::Ready);
            tracing::info!("Speech engine ready ({})", model.id());
        }
        Ok(Err(e)) => fail(&inner, format!("Model load failed: {e:#}")),
        Err(e) => fail(&inner, format!("Model load task failed: {e}")),
    }
}

fn fail(inner: &EngineInner, message: String) {
    tracing::error!("{message}");
    inner.set_phase(EnginePhase::Failed {
        message: message.clone(),
    });
    let _ = inner.updates.send(EngineUpdate::Failed(message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    /// Backend that always hears the same phrase.
    struct OneLinerModel;

    impl SpeechModel for OneLinerModel {
        fn transcribe(&mut self, _samples: &[f32]) -> Result<String> {
            Ok("testing one two three four".to_string())
        }
    }

    fn small_settings() -> StreamSettings {
        StreamSettings {
            sample_rate: 16000,
            window_samples: 64,
            decode_stride: 4,
            stable_decodes: 2,
            silence_rms: 0.001,
            max_pending_words: 8,
            silence_commit_streak: 2,
        }
    }

    fn collect_until<F: Fn(&[EngineUpdate]) -> bool>(
        rx: &Receiver<EngineUpdate>,
        done: F,
    ) -> Vec<EngineUpdate> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = Vec::new();
        while Instant::now() < deadline && !done(&seen) {
            if let Ok(update) = rx.recv_timeout(Duration::from_millis(20)) {
                seen.push(update);
            }
        }
        seen
    }

    #[test]
    fn with_decoder_is_ready_immediately() {
        let (engine, _rx) =
            TranscriptionEngine::with_decoder(Box::new(OneLinerModel), small_settings());
        assert!(engine.is_ready());
        assert_eq!(engine.download_progress(), 1.0);
        assert!(engine.failure().is_none());
    }

    #[tokio::test]
    async fn stream_rejects_when_not_ready() {
        let (engine, _rx) =
            TranscriptionEngine::with_decoder(Box::new(OneLinerModel), small_settings());
        engine
            .inner
            .set_phase(EnginePhase::Downloading { progress: 0.3 });

        assert!(engine.stream().await.is_err());
        assert_eq!(engine.streams_started(), 0);
    }

    #[tokio::test]
    async fn stream_rejects_double_start() {
        let (engine, _rx) =
            TranscriptionEngine::with_decoder(Box::new(OneLinerModel), small_settings());

        engine.stream().await.unwrap();
        assert!(engine.stream().await.is_err());
        assert_eq!(engine.streams_started(), 1);

        engine.stream_stop();
        assert!(!engine.is_streaming());
    }

    #[tokio::test]
    async fn session_emits_tentative_and_committed_text() {
        let (engine, rx) =
            TranscriptionEngine::with_decoder(Box::new(OneLinerModel), small_settings());

        engine.stream().await.unwrap();
        for _ in 0..4 {
            engine.stream_insert(&[0.5; 4]);
        }
        engine.stream_stop();

        let updates = collect_until(&rx, |seen| {
            seen.iter()
                .filter(|u| matches!(u, EngineUpdate::Committed(_)))
                .count()
                >= 2
        });

        let committed: String = updates
            .iter()
            .filter_map(|u| match u {
                EngineUpdate::Committed(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(committed, "testing one two three four ");
        assert_eq!(engine.chunks_inserted(), 4);
    }

    #[tokio::test]
    async fn insert_without_session_is_inert() {
        let (engine, _rx) =
            TranscriptionEngine::with_decoder(Box::new(OneLinerModel), small_settings());
        engine.stream_insert(&[0.5; 4]);
        assert_eq!(engine.chunks_inserted(), 0);
        engine.stream_stop(); // also inert
    }
}
