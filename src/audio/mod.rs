//! Audio capture for sotto.
//!
//! Provides the one-time audio session setup, the long-lived microphone
//! capture handle, and the buffering that turns raw device callbacks into
//! fixed-length chunks for the speech engine.

pub mod chunk;
pub mod recorder;
pub mod session;

pub use chunk::{ChunkAssembler, Decimator};
pub use recorder::{BufferSubscription, CaptureSource, ChunkHandler, Recorder};
pub use session::prepare_audio_session;
