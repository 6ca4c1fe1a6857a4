//! Recording session management.
//!
//! Owns the screen's state: the Idle/Recording toggle, the session tokens
//! that order a stop against a still-pending start, the pulse animation,
//! and the transcript strings the screen renders.

pub mod controller;
pub mod pulse;
pub mod state;
pub mod transcript;

pub use controller::RecordingController;
pub use pulse::PulseAnimation;
pub use state::{RecordingState, SessionCounter, SessionToken};
pub use transcript::{AccumulationStrategy, TranscriptAccumulator};
