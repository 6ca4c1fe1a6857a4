//! Streaming session worker.
//!
//! Turns a stream of fixed-length audio chunks into committed and tentative
//! transcript updates. The worker keeps a sliding audio window and re-decodes
//! it on a fixed cadence of newly arrived audio. Words that have already been
//! committed are locked and never revised; words still pending can be
//! corrected by a later decode. Pending words are committed once they have
//! survived several consecutive decodes unchanged, when too many of them
//! accumulate, or when a sustained silence ends the phrase.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Mutex;

use super::decoder::SpeechModel;
use super::EngineUpdate;
use crate::config::EngineConfig;

/// Cap on locked words kept for window matching; older words have scrolled
/// out of the audio window and can no longer appear in a decode.
const MAX_LOCKED_WORDS: usize = 24;

/// Tuning for a streaming session.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Engine sample rate in Hz
    pub sample_rate: u32,
    /// Maximum sliding window length in samples
    pub window_samples: usize,
    /// New samples accumulated before each re-decode
    pub decode_stride: usize,
    /// Consecutive unchanged decodes before pending words commit
    pub stable_decodes: u32,
    /// RMS amplitude below which a stride counts as silence
    pub silence_rms: f32,
    /// Pending word count that forces an early commit
    pub max_pending_words: usize,
    /// Consecutive silent strides that commit the pending phrase
    pub silence_commit_streak: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for StreamSettings {
    fn from(config: &EngineConfig) -> Self {
        let sample_rate = 16000u32;
        Self {
            sample_rate,
            window_samples: (config.window_seconds * sample_rate) as usize,
            decode_stride: (config.decode_interval_ms as usize * sample_rate as usize) / 1000,
            stable_decodes: config.stable_decodes.max(1),
            silence_rms: config.silence_threshold,
            max_pending_words: 8,
            silence_commit_streak: 2,
        }
    }
}

/// Word-level diff state for one session.
struct SessionState {
    /// Committed words assumed to still be inside the audio window
    locked: Vec<String>,
    /// Words output but still open to correction
    pending: Vec<String>,
    /// Consecutive decodes that did not revise any pending word
    stable_rounds: u32,
    /// Consecutive strides below the silence threshold
    silence_streak: u32,
}

impl SessionState {
    fn new() -> Self {
        Self {
            locked: Vec::new(),
            pending: Vec::new(),
            stable_rounds: 0,
            silence_streak: 0,
        }
    }
}

/// Runs one streaming session to completion.
///
/// Consumes chunks until the sender side is dropped, then commits whatever
/// is still pending. Updates are emitted through `updates`; a closed update
/// channel ends the session early.
pub(crate) fn run_stream(
    decoder: &Mutex<Option<Box<dyn SpeechModel>>>,
    settings: &StreamSettings,
    chunks: Receiver<Vec<f32>>,
    updates: &Sender<EngineUpdate>,
) {
    let mut window: Vec<f32> = Vec::with_capacity(settings.window_samples);
    let mut fresh = 0usize;
    let mut state = SessionState::new();
    let mut decodes = 0u64;

    while let Ok(chunk) = chunks.recv() {
        window.extend_from_slice(&chunk);
        fresh += chunk.len();
        if fresh < settings.decode_stride {
            continue;
        }

        let tail = fresh.min(window.len());
        let stride_rms = rms(&window[window.len() - tail..]);
        fresh = 0;

        if stride_rms < settings.silence_rms {
            state.silence_streak += 1;

            // A sustained pause is a phrase boundary: commit what we have
            // and start the next phrase from a clean window.
            if state.silence_streak >= settings.silence_commit_streak {
                if !state.pending.is_empty() {
                    let words: Vec<String> = state.pending.drain(..).collect();
                    if commit(updates, &words).is_err() {
                        return;
                    }
                    if updates.send(EngineUpdate::Tentative(String::new())).is_err() {
                        return;
                    }
                }
                window.clear();
                state.locked.clear();
                state.stable_rounds = 0;
            }
            continue;
        }
        state.silence_streak = 0;

        if window.len() > settings.window_samples {
            let excess = window.len() - settings.window_samples;
            window.drain(0..excess);
        }

        let text = {
            let mut guard = decoder.lock().unwrap();
            let Some(model) = guard.as_mut() else {
                tracing::error!("Streaming session has no model backend, ending");
                return;
            };
            match model.transcribe(&window) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Decode failed, skipping window: {e:#}");
                    continue;
                }
            }
        };
        decodes += 1;

        let current: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if current.is_empty() {
            continue;
        }

        if apply_decode(&mut state, current, settings, updates).is_err() {
            return;
        }
    }

    // End of stream: whatever is still pending becomes final.
    if !state.pending.is_empty() {
        let words: Vec<String> = state.pending.drain(..).collect();
        let _ = commit(updates, &words);
    }

    tracing::debug!("Streaming session ended after {} decodes", decodes);
}

/// Diffs one decode result against the session state, emitting updates.
///
/// Returns `Err(())` when the update channel is closed.
fn apply_decode(
    state: &mut SessionState,
    current: Vec<String>,
    settings: &StreamSettings,
    updates: &Sender<EngineUpdate>,
) -> Result<(), ()> {
    let match_len = matching_prefix(&state.locked, &state.pending, &current);

    if match_len < state.locked.len() {
        // The decode no longer contains words we already locked; the window
        // has scrolled past them. Locked words stay locked, and the decode
        // becomes the new pending hypothesis.
        tracing::debug!(
            "Decode diverged inside locked words ({} < {})",
            match_len,
            state.locked.len()
        );
        state.locked.clear();
        state.pending = current;
        state.stable_rounds = 0;
        return send_tentative(state, updates);
    }

    let pending_match = match_len - state.locked.len();
    let deletions = state.pending.len().saturating_sub(pending_match);

    if deletions > 0 {
        state.stable_rounds = 0;
    } else {
        state.stable_rounds += 1;
    }

    state.pending.truncate(pending_match);
    state
        .pending
        .extend(current.into_iter().skip(match_len));

    // Commit the stable prefix, always holding back the freshest words
    // since they are the ones a later decode is most likely to revise.
    if !state.pending.is_empty()
        && (state.stable_rounds >= settings.stable_decodes
            || state.pending.len() >= settings.max_pending_words)
    {
        let hold_back = if state.stable_rounds >= settings.stable_decodes {
            2
        } else {
            3
        };
        let commit_count = state.pending.len().saturating_sub(hold_back);
        if commit_count > 0 {
            let words: Vec<String> = state.pending.drain(0..commit_count).collect();
            commit(updates, &words)?;
            state.locked.extend(words);
            state.stable_rounds = 0;

            if state.locked.len() > MAX_LOCKED_WORDS {
                let excess = state.locked.len() - MAX_LOCKED_WORDS;
                state.locked.drain(0..excess);
            }
        }
    }

    send_tentative(state, updates)
}

/// Emits a committed-text increment with its trailing separator.
fn commit(updates: &Sender<EngineUpdate>, words: &[String]) -> Result<(), ()> {
    let mut increment = words.join(" ");
    increment.push(' ');
    tracing::debug!("Committing: {:?}", increment);
    updates
        .send(EngineUpdate::Committed(increment))
        .map_err(|_| ())
}

fn send_tentative(state: &SessionState, updates: &Sender<EngineUpdate>) -> Result<(), ()> {
    updates
        .send(EngineUpdate::Tentative(state.pending.join(" ")))
        .map_err(|_| ())
}

/// Length of the longest prefix of `locked ++ pending` that matches `current`.
///
/// Comparison ignores case and punctuation so "world" matches "World.".
fn matching_prefix(locked: &[String], pending: &[String], current: &[String]) -> usize {
    let reference = locked.iter().chain(pending.iter());
    let mut match_len = 0;
    for (known, heard) in reference.zip(current.iter()) {
        if words_equal(known, heard) {
            match_len += 1;
        } else {
            break;
        }
    }
    match_len
}

fn words_equal(a: &str, b: &str) -> bool {
    let strip = |s: &str| {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect::<String>()
    };
    strip(a) == strip(b)
}

/// Root-mean-square amplitude of a stride, in [0, 1] for full-scale input.
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::mpsc;

    /// Model returning scripted outputs regardless of audio content.
    struct ScriptedModel {
        outputs: Vec<&'static str>,
        calls: usize,
    }

    impl ScriptedModel {
        fn new(outputs: Vec<&'static str>) -> Self {
            Self { outputs, calls: 0 }
        }
    }

    impl SpeechModel for ScriptedModel {
        fn transcribe(&mut self, _samples: &[f32]) -> Result<String> {
            let i = self.calls.min(self.outputs.len().saturating_sub(1));
            self.calls += 1;
            Ok(self.outputs[i].to_string())
        }
    }

    fn settings() -> StreamSettings {
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

    /// Feeds scripted chunks through a full session and collects all updates.
    fn drive(model: ScriptedModel, settings: &StreamSettings, chunks: Vec<Vec<f32>>) -> Vec<EngineUpdate> {
        let decoder: Mutex<Option<Box<dyn SpeechModel>>> = Mutex::new(Some(Box::new(model)));
        let (chunk_tx, chunk_rx) = mpsc::channel();
        let (update_tx, update_rx) = mpsc::channel();

        for chunk in chunks {
            chunk_tx.send(chunk).unwrap();
        }
        drop(chunk_tx);

        run_stream(&decoder, settings, chunk_rx, &update_tx);
        drop(update_tx);

        update_rx.into_iter().collect()
    }

    fn committed(updates: &[EngineUpdate]) -> Vec<String> {
        updates
            .iter()
            .filter_map(|u| match u {
                EngineUpdate::Committed(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn tentatives(updates: &[EngineUpdate]) -> Vec<String> {
        updates
            .iter()
            .filter_map(|u| match u {
                EngineUpdate::Tentative(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn speech_chunk() -> Vec<f32> {
        vec![0.5; 4]
    }

    fn silent_chunk() -> Vec<f32> {
        vec![0.0; 4]
    }

    #[test]
    fn stable_words_commit_exactly_once() {
        let model = ScriptedModel::new(vec![
            "one two three four five",
            "one two three four five",
            "one two three four five",
            "one two three four five",
        ]);
        let updates = drive(model, &settings(), vec![speech_chunk(); 4]);

        // Second decode is the second stable round: commit all but the
        // held-back tail, then the remainder commits at end of stream.
        assert_eq!(
            committed(&updates),
            vec!["one two three ".to_string(), "four five ".to_string()]
        );
        assert_eq!(tentatives(&updates).last().unwrap(), "four five");
    }

    #[test]
    fn correction_revises_pending_words() {
        let mut s = settings();
        s.stable_decodes = 10; // keep everything pending
        let model = ScriptedModel::new(vec!["hello word", "hello world"]);
        let updates = drive(model, &s, vec![speech_chunk(); 2]);

        assert_eq!(
            tentatives(&updates),
            vec!["hello word".to_string(), "hello world".to_string()]
        );
    }

    #[test]
    fn silence_commits_the_pending_phrase() {
        let mut s = settings();
        s.stable_decodes = 10;
        let model = ScriptedModel::new(vec!["hello there"]);
        let chunks = vec![speech_chunk(), silent_chunk(), silent_chunk()];
        let updates = drive(model, &s, chunks);

        assert_eq!(committed(&updates), vec!["hello there ".to_string()]);
        assert_eq!(tentatives(&updates).last().unwrap(), "");
    }

    #[test]
    fn locked_words_survive_a_diverged_decode() {
        let mut s = settings();
        s.stable_decodes = 1; // commit aggressively so words lock early
        let model = ScriptedModel::new(vec!["alpha beta gamma delta", "zebra"]);
        let updates = drive(model, &s, vec![speech_chunk(); 2]);

        // "alpha beta" locked by the first decode; the divergent second
        // decode must not revoke it, only replace the pending hypothesis.
        let all_committed = committed(&updates).join("");
        assert!(all_committed.starts_with("alpha beta "));
        assert_eq!(all_committed.matches("alpha").count(), 1);
        assert_eq!(tentatives(&updates).last().unwrap(), "zebra");
    }

    #[test]
    fn punctuation_does_not_break_matching() {
        let mut s = settings();
        s.stable_decodes = 2;
        let model = ScriptedModel::new(vec![
            "hello world how are you",
            "Hello, world. How are you?",
        ]);
        let updates = drive(model, &s, vec![speech_chunk(); 2]);

        // The second decode matches the first despite punctuation, so it
        // counts as stable and commits.
        assert!(!committed(&updates).is_empty());
    }

    #[test]
    fn end_of_stream_commits_remainder() {
        let mut s = settings();
        s.stable_decodes = 10;
        let model = ScriptedModel::new(vec!["goodbye"]);
        let updates = drive(model, &s, vec![speech_chunk()]);

        assert_eq!(committed(&updates), vec!["goodbye ".to_string()]);
    }
}
