//! Speech model catalog.
//!
//! Defines the whisper.cpp GGML models sotto knows how to download and run,
//! with their associated metadata, file names, and download URLs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Represents a supported speech model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineModel {
    /// Whisper tiny, English-only (fastest, lowest accuracy)
    WhisperTinyEn,
    /// Whisper base, English-only (balanced)
    WhisperBaseEn,
    /// Whisper small, English-only (best accuracy of the supported set)
    WhisperSmallEn,
}

impl EngineModel {
    /// Returns the model identifier as a string
    pub fn id(&self) -> &'static str {
        match self {
            EngineModel::WhisperTinyEn => "whisper-tiny-en",
            EngineModel::WhisperBaseEn => "whisper-base-en",
            EngineModel::WhisperSmallEn => "whisper-small-en",
        }
    }

    /// Returns a human-readable name for the model
    pub fn name(&self) -> &'static str {
        match self {
            EngineModel::WhisperTinyEn => "Whisper Tiny (English)",
            EngineModel::WhisperBaseEn => "Whisper Base (English)",
            EngineModel::WhisperSmallEn => "Whisper Small (English)",
        }
    }

    /// Returns a human-readable description of the model
    pub fn description(&self) -> &'static str {
        match self {
            EngineModel::WhisperTinyEn => "Fastest, good for live dictation (~75MB)",
            EngineModel::WhisperBaseEn => "Balanced speed and accuracy (~142MB)",
            EngineModel::WhisperSmallEn => "Best accuracy, needs a faster CPU (~466MB)",
        }
    }

    /// Returns the on-disk file name of the model
    pub fn filename(&self) -> &'static str {
        match self {
            EngineModel::WhisperTinyEn => "ggml-tiny.en.bin",
            EngineModel::WhisperBaseEn => "ggml-base.en.bin",
            EngineModel::WhisperSmallEn => "ggml-small.en.bin",
        }
    }

    /// Returns the download URL for the model
    pub fn url(&self) -> &'static str {
        match self {
            EngineModel::WhisperTinyEn => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.en.bin"
            }
            EngineModel::WhisperBaseEn => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.en.bin"
            }
            EngineModel::WhisperSmallEn => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.en.bin"
            }
        }
    }

    /// Returns the approximate download size in megabytes
    pub fn size_mb(&self) -> u64 {
        match self {
            EngineModel::WhisperTinyEn => 75,
            EngineModel::WhisperBaseEn => 142,
            EngineModel::WhisperSmallEn => 466,
        }
    }

    /// Returns the forced decode language, if the model is monolingual
    pub fn language(&self) -> Option<&'static str> {
        match self {
            EngineModel::WhisperTinyEn
            | EngineModel::WhisperBaseEn
            | EngineModel::WhisperSmallEn => Some("en"),
        }
    }

    /// Returns the full path of the model file inside `models_dir`
    pub fn path_in(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.filename())
    }

    /// Returns whether the model file is present inside `models_dir`
    pub fn is_downloaded(&self, models_dir: &Path) -> bool {
        self.path_in(models_dir).is_file()
    }

    /// Parses a model ID string into an EngineModel
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "whisper-tiny-en" => Some(EngineModel::WhisperTinyEn),
            "whisper-base-en" => Some(EngineModel::WhisperBaseEn),
            "whisper-small-en" => Some(EngineModel::WhisperSmallEn),
            _ => None,
        }
    }

    /// Returns all available models
    pub fn all() -> &'static [Self] {
        &[
            EngineModel::WhisperTinyEn,
            EngineModel::WhisperBaseEn,
            EngineModel::WhisperSmallEn,
        ]
    }

    /// Returns all available model IDs
    pub fn available_ids() -> Vec<&'static str> {
        Self::all().iter().map(|m| m.id()).collect()
    }
}

impl Default for EngineModel {
    fn default() -> Self {
        EngineModel::WhisperTinyEn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip() {
        for model in EngineModel::all() {
            assert_eq!(EngineModel::from_id(model.id()), Some(*model));
        }
    }

    #[test]
    fn unknown_id_is_none() {
        assert_eq!(EngineModel::from_id("whisper-enormous"), None);
    }

    #[test]
    fn path_in_uses_filename() {
        let dir = PathBuf::from("/tmp/models");
        assert_eq!(
            EngineModel::WhisperTinyEn.path_in(&dir),
            PathBuf::from("/tmp/models/ggml-tiny.en.bin")
        );
    }
}
