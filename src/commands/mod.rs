//! Application command handlers for sotto.
//!
//! This module organizes command handling into separate submodules, each responsible for a specific
//! application command.
//!
//! # Commands
//! - `live`: The live dictation screen (default command)
//! - `models`: Model catalog listing and ahead-of-time download
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod list_devices;
pub mod live;
pub mod logs;
pub mod models;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use live::handle_live;
pub use logs::handle_logs;
pub use models::{handle_download, handle_models};
