//! Configuration management for sotto.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory and created with default
//! values the first time sotto runs.

pub mod file;

pub use file::{AudioConfig, EngineConfig, SottoConfig, TranscriptConfig, VisualizationType};
