//! Speech model backends.
//!
//! The engine talks to the acoustic model through the [`SpeechModel`] trait;
//! the production backend wraps whisper.cpp via the whisper-rs bindings.
//! Unit tests substitute scripted fakes at this seam.

use anyhow::{anyhow, Result};
use std::path::Path;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Trait for speech-to-text model backends.
///
/// Input is mono f32 audio at 16kHz. Output is the transcription of the
/// whole buffer; an empty string means no recognizable speech.
pub trait SpeechModel: Send {
    /// Transcribe audio samples to text
    fn transcribe(&mut self, samples: &[f32]) -> Result<String>;
}

/// Whisper model backend using whisper.cpp for on-device inference.
pub struct WhisperModel {
    ctx: WhisperContext,
    language: Option<&'static str>,
    threads: i32,
}

impl WhisperModel {
    /// Loads a GGML model file from disk.
    ///
    /// Loading is CPU and memory heavy (tens of MB to hundreds of MB read
    /// and mmapped); callers run this off the UI thread.
    ///
    /// # Errors
    /// - If the model path is not valid UTF-8
    /// - If whisper.cpp fails to load the model
    pub fn load(model_path: &Path, language: Option<&'static str>) -> Result<Self> {
        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("Model path is not valid UTF-8: {}", model_path.display()))?;

        tracing::info!("Loading speech model from: {}", model_path.display());
        let start = std::time::Instant::now();

        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| anyhow!("Failed to load speech model: {e}"))?;

        let threads = std::thread::available_parallelism()
            .map(|n| n.get() as i32)
            .unwrap_or(4)
            .min(8);

        tracing::info!(
            "Speech model loaded in {:?} ({} inference threads)",
            start.elapsed(),
            threads
        );

        Ok(Self {
            ctx,
            language,
            threads,
        })
    }
}

impl SpeechModel for WhisperModel {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| anyhow!("Failed to create decode state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.threads);
        params.set_translate(false);
        if let Some(lang) = self.language {
            params.set_language(Some(lang));
        }
        // Each window decodes independently; carrying context across decodes
        // makes the sliding-window diff unstable.
        params.set_no_context(true);
        params.set_suppress_blank(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let _ = state
            .full(params, samples)
            .map_err(|e| anyhow!("Decode failed: {e}"))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| anyhow!("Failed to read segment count: {e}"))?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| anyhow!("Failed to read segment {i}: {e}"))?;
            if !text.is_empty() && !segment.trim().is_empty() {
                text.push(' ');
            }
            text.push_str(segment.trim());
        }

        Ok(text.trim().to_string())
    }
}
