//! Configuration file management for sotto.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::session::AccumulationStrategy;

/// Visualization type for the live input display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    /// Time-domain waveform showing amplitude over time
    Waveform,
    /// Frequency spectrum showing energy distribution across frequencies
    #[default]
    Spectrum,
}

impl std::fmt::Display for VisualizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waveform => write!(f, "waveform"),
            Self::Spectrum => write!(f, "spectrum"),
        }
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `sotto list-devices`
    /// - device name from `sotto list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Capture sample rate in Hz delivered to the speech engine
    /// (16000 is what the models expect)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Chunk length in samples handed to the engine per delivery
    /// (1600 samples = 100ms at 16kHz)
    #[serde(default = "default_buffer_length")]
    pub buffer_length_in_samples: usize,
    /// Reference level in dBFS for 100% meter display (typical: -20 to -6 dBFS)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
    /// Visualization type: "spectrum" (frequency-based) or "waveform" (time-based amplitude)
    #[serde(default)]
    pub visualization: VisualizationType,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_buffer_length() -> usize {
    1600
}

fn default_reference_level_db() -> i8 {
    -20
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            buffer_length_in_samples: default_buffer_length(),
            reference_level_db: default_reference_level_db(),
            visualization: VisualizationType::default(),
        }
    }
}

/// Speech engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model id from the catalog (see `sotto models`)
    #[serde(default = "default_model")]
    pub model: String,
    /// Directory where model files are stored. Defaults to ~/.config/sotto/models
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    /// How much new audio (in milliseconds) accumulates before the engine re-decodes
    #[serde(default = "default_decode_interval_ms")]
    pub decode_interval_ms: u64,
    /// Maximum audio window (in seconds) kept for re-decoding
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u32,
    /// Number of consecutive stable decodes before pending words are committed
    #[serde(default = "default_stable_decodes")]
    pub stable_decodes: u32,
    /// RMS amplitude below which a decode interval counts as silence
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
}

fn default_model() -> String {
    "whisper-tiny-en".to_string()
}

fn default_decode_interval_ms() -> u64 {
    1000
}

fn default_window_seconds() -> u32 {
    10
}

fn default_stable_decodes() -> u32 {
    3
}

fn default_silence_threshold() -> f32 {
    0.01
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            models_dir: None,
            decode_interval_ms: default_decode_interval_ms(),
            window_seconds: default_window_seconds(),
            stable_decodes: default_stable_decodes(),
            silence_threshold: default_silence_threshold(),
        }
    }
}

/// Transcript handling configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// How committed text accumulates: "append" keeps a growing transcript,
    /// "latest" shows only the most recent committed segment
    #[serde(default)]
    pub accumulation: AccumulationStrategy,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SottoConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

impl SottoConfig {
    /// Loads configuration from the user's config directory, writing a
    /// default config file on first run.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load_or_init() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            let config = SottoConfig::default();
            config.save()?;
            tracing::info!("Created default configuration at {}", config_path.display());
            return Ok(config);
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: SottoConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }

    /// Returns the directory where model files are stored.
    ///
    /// # Errors
    /// - If the home directory cannot be determined
    pub fn models_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.engine.models_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".config").join("sotto").join("models"))
    }
}

/// Retrieves the path to the config file, creating the config directory if needed.
///
/// # Errors
/// - If the config directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
    let config_dir = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    let config_path = config_dir.join(".config").join("sotto").join("sotto.toml");

    std::fs::create_dir_all(config_path.parent().unwrap())?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_expectations() {
        let config = SottoConfig::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.buffer_length_in_samples, 1600);
        assert_eq!(config.engine.model, "whisper-tiny-en");
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: SottoConfig = toml::from_str("").unwrap();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.engine.window_seconds, 10);
        assert_eq!(config.transcript.accumulation, AccumulationStrategy::Append);
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = SottoConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: SottoConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.audio.sample_rate, config.audio.sample_rate);
        assert_eq!(parsed.engine.model, config.engine.model);
    }

    #[test]
    fn parses_partial_override() {
        let config: SottoConfig = toml::from_str(
            "[engine]\nmodel = \"whisper-base-en\"\n\n[transcript]\naccumulation = \"latest\"\n",
        )
        .unwrap();
        assert_eq!(config.engine.model, "whisper-base-en");
        assert_eq!(config.transcript.accumulation, AccumulationStrategy::Latest);
        assert_eq!(config.audio.sample_rate, 16000);
    }
}
