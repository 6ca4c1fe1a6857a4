//! The live dictation screen.
//!
//! Wires the capture, engine, controller, and accumulator together and runs
//! the screen's event loop: poll input, apply deferred session results,
//! drain engine updates, render. Supports external toggling via SIGUSR1.

use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::{self, Recorder};
use crate::clipboard::copy_to_clipboard;
use crate::config::SottoConfig;
use crate::engine::{EngineModel, EngineUpdate, StreamSettings, TranscriptionEngine};
use crate::session::{RecordingController, RecordingState, TranscriptAccumulator};
use crate::ui::{ErrorScreen, LiveScreen, ScreenCommand, ViewModel};

/// Runs the live dictation screen until the user exits.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the configured model id is unknown
/// - If the terminal UI cannot be initialized
pub async fn handle_live() -> Result<(), anyhow::Error> {
    tracing::info!("=== sotto live screen started ===");

    let config = match SottoConfig::load_or_init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err:#}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/sotto/sotto.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, chunk={} samples, model={}",
        config.audio.device,
        config.audio.sample_rate,
        config.audio.buffer_length_in_samples,
        config.engine.model
    );

    let Some(model) = EngineModel::from_id(&config.engine.model) else {
        let mut error_screen = ErrorScreen::new()?;
        error_screen.show_error(&format!(
            "Error: Unknown model '{}'.\n\nAvailable models: {}",
            config.engine.model,
            EngineModel::available_ids().join(", ")
        ))?;
        error_screen.cleanup()?;
        return Err(anyhow!("Unknown model: {}", config.engine.model));
    };

    // One-time session setup; failure is logged and ignored
    audio::prepare_audio_session(&config.audio.device);

    let models_dir = config.models_dir()?;
    let settings = StreamSettings::from(&config.engine);
    let (engine, engine_updates) = TranscriptionEngine::new(model, models_dir, settings);

    let recorder = Recorder::new(&config.audio);
    let mut controller = RecordingController::new(recorder, engine.clone());
    let mut accumulator = TranscriptAccumulator::new(config.transcript.accumulation);

    let mut screen = LiveScreen::new(
        config.audio.visualization,
        config.audio.reference_level_db,
        config.audio.sample_rate,
    )
    .map_err(|e| anyhow!("Failed to initialize UI: {e}"))?;

    // External toggle trigger, e.g. from a window-manager hotkey
    let external_toggle = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&external_toggle))
        .map_err(|e| anyhow!("Failed to register signal handler: {e}"))?;

    tracing::debug!("Entering live loop. Space toggles recording, 'q' exits.");
    let mut prev_state = controller.state();

    loop {
        match screen.handle_input() {
            Ok(ScreenCommand::Continue) => {}
            Ok(ScreenCommand::Toggle) => {
                if engine.is_ready() {
                    controller.toggle();
                } else {
                    tracing::debug!("Toggle ignored: engine not ready");
                }
            }
            Ok(ScreenCommand::Clear) => {
                accumulator.clear();
            }
            Ok(ScreenCommand::CopyTranscript) => {
                if !accumulator.is_empty() {
                    if let Err(e) = copy_to_clipboard(&accumulator.full_text()) {
                        tracing::warn!("Failed to copy transcript: {e:#}");
                    }
                }
            }
            Ok(ScreenCommand::Quit) => {
                break;
            }
            Err(e) => {
                tracing::error!("Input handling error: {}", e);
                return Err(anyhow!("Input handling error: {e}"));
            }
        }

        if external_toggle.swap(false, Ordering::Relaxed) {
            if engine.is_ready() {
                tracing::info!("Received SIGUSR1: toggling recording");
                controller.toggle();
            } else {
                tracing::debug!("SIGUSR1 ignored: engine not ready");
            }
        }

        // Apply deferred stream-start results (may force a stop)
        controller.poll();

        // Drain engine updates into the transcript
        while let Ok(update) = engine_updates.try_recv() {
            match &update {
                EngineUpdate::Tentative(_) => {
                    // A hypothesis arriving after capture stopped is stale
                    if controller.state() == RecordingState::Recording {
                        accumulator.apply(&update);
                    }
                }
                _ => accumulator.apply(&update),
            }
        }

        // A stop from any path clears the in-flight hypothesis immediately
        let state = controller.state();
        if prev_state == RecordingState::Recording && state == RecordingState::Idle {
            accumulator.on_recording_stopped();
        }
        prev_state = state;

        let failure = engine.failure();
        let latest_chunk = controller.recorder().latest_chunk();
        let view = ViewModel {
            ready: engine.is_ready(),
            progress: engine.download_progress(),
            failure: failure.as_deref(),
            state,
            pulse_scale: controller.pulse_scale(),
            level: controller.recorder().input_level(),
            latest_chunk: &latest_chunk,
            recording_elapsed: controller.recording_elapsed(),
            committed: accumulator.committed(),
            tentative: accumulator.tentative(),
        };
        screen
            .render(&view)
            .map_err(|e| anyhow!("Render failed: {e}"))?;
    }

    // Symmetric teardown if the user quits mid-recording
    if controller.state() == RecordingState::Recording {
        controller.toggle();
    }

    screen
        .cleanup()
        .map_err(|e| anyhow!("Cleanup failed: {e}"))?;

    tracing::info!(
        "=== sotto live screen exited ({} sessions, {} chunks) ===",
        engine.streams_started(),
        engine.chunks_inserted()
    );
    Ok(())
}
