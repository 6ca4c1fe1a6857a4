//! Terminal user interface for the live dictation screen.

pub mod error;
pub mod screen;
pub mod viz;

pub use error::ErrorScreen;
pub use screen::{LiveScreen, ScreenCommand, ViewModel};
