//! Microphone capture handle.
//!
//! The recorder owns a single cpal input stream and delivers fixed-length
//! mono chunks at the engine sample rate to a registered subscriber. The
//! subscription is an explicit guard: dropping it renders the handler inert,
//! so no audio can be delivered into a stream that has logically ended.

use anyhow::Result;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::chunk::{ChunkAssembler, Decimator};
use super::session::{find_input_device, suppress_alsa_warnings};
use crate::config::AudioConfig;

/// Callback invoked with each completed capture chunk.
pub type ChunkHandler = Box<dyn FnMut(&[f32]) + Send>;

type HandlerSlot = Arc<Mutex<Option<ChunkHandler>>>;

/// Guard for a registered chunk handler.
///
/// Dropping the guard unregisters the handler. The capture stream may keep
/// running, but no further chunks are delivered.
pub struct BufferSubscription {
    slot: HandlerSlot,
}

impl BufferSubscription {
    pub(crate) fn new(slot: HandlerSlot) -> Self {
        Self { slot }
    }
}

impl Drop for BufferSubscription {
    fn drop(&mut self) {
        *self.slot.lock().unwrap() = None;
        tracing::debug!("Buffer subscription released");
    }
}

/// Source of fixed-length audio chunks.
///
/// Implemented by [`Recorder`] for real capture and by test doubles in unit
/// tests of the recording controller.
pub trait CaptureSource {
    /// Registers the chunk handler. Must be called before [`start`](Self::start)
    /// so the first chunk is never dropped.
    fn subscribe(&mut self, handler: ChunkHandler) -> BufferSubscription;

    /// Starts capturing.
    fn start(&mut self) -> Result<()>;

    /// Stops capturing. Idempotent.
    fn stop(&mut self);
}

/// Per-stream capture state living inside the cpal callback.
struct CaptureSink {
    channels: usize,
    decimator: Decimator,
    assembler: ChunkAssembler,
    handler: HandlerSlot,
    level: Arc<AtomicU32>,
    latest_chunk: Arc<Mutex<Vec<f32>>>,
    mono_buf: Vec<f32>,
}

impl CaptureSink {
    fn new(
        channels: usize,
        device_rate: u32,
        target_rate: u32,
        chunk_len: usize,
        handler: HandlerSlot,
        level: Arc<AtomicU32>,
        latest_chunk: Arc<Mutex<Vec<f32>>>,
    ) -> Self {
        Self {
            channels,
            decimator: Decimator::new(device_rate, target_rate),
            assembler: ChunkAssembler::new(chunk_len),
            handler,
            level,
            latest_chunk,
            mono_buf: Vec::new(),
        }
    }

    /// Consumes interleaved device frames: downmix, decimate, chunk, dispatch.
    fn consume(&mut self, frames: &[f32]) {
        self.mono_buf.clear();
        if self.channels >= 2 {
            for frame in frames.chunks(self.channels) {
                let sum: f32 = frame.iter().sum();
                self.mono_buf.push(sum / self.channels as f32);
            }
        } else {
            self.mono_buf.extend_from_slice(frames);
        }

        let resampled = self.decimator.feed(&self.mono_buf);
        if resampled.is_empty() {
            return;
        }

        let handler = &self.handler;
        let level = &self.level;
        let latest = &self.latest_chunk;
        self.assembler.push(&resampled, |chunk| {
            level.store(rms(chunk).to_bits(), Ordering::Relaxed);
            *latest.lock().unwrap() = chunk.to_vec();

            if let Some(h) = handler.lock().unwrap().as_mut() {
                h(chunk);
            }
        });
    }
}

/// Root-mean-square amplitude of a chunk, in [0, 1] for full-scale input.
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Long-lived microphone capture handle.
///
/// Configured once with the engine's fixed sample rate and chunk length;
/// the device's native rate and channel count are adapted internally.
pub struct Recorder {
    device_name: String,
    target_sample_rate: u32,
    chunk_len: usize,
    handler: HandlerSlot,
    stream: Option<cpal::Stream>,
    level: Arc<AtomicU32>,
    latest_chunk: Arc<Mutex<Vec<f32>>>,
}

impl Recorder {
    /// Creates a recorder from the audio configuration. The device is not
    /// opened until [`start`](CaptureSource::start).
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            device_name: config.device.clone(),
            target_sample_rate: config.sample_rate,
            chunk_len: config.buffer_length_in_samples,
            handler: Arc::new(Mutex::new(None)),
            stream: None,
            level: Arc::new(AtomicU32::new(0)),
            latest_chunk: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the RMS level of the most recent chunk, in [0, 1].
    pub fn input_level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }

    /// Returns a copy of the most recent chunk for the level/spectrum display.
    pub fn latest_chunk(&self) -> Vec<f32> {
        self.latest_chunk.lock().unwrap().clone()
    }
}

impl CaptureSource for Recorder {
    fn subscribe(&mut self, handler: ChunkHandler) -> BufferSubscription {
        *self.handler.lock().unwrap() = Some(handler);
        tracing::debug!("Buffer subscription registered");
        BufferSubscription::new(Arc::clone(&self.handler))
    }

    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            tracing::debug!("Capture already running");
            return Ok(());
        }

        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            find_input_device(&host, &self.device_name)
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;
        let sample_format = device_config.sample_format();

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            device_sample_rate,
            num_channels,
            sample_format
        );

        let mut sink = CaptureSink::new(
            num_channels,
            device_sample_rate,
            self.target_sample_rate,
            self.chunk_len,
            Arc::clone(&self.handler),
            Arc::clone(&self.level),
            Arc::clone(&self.latest_chunk),
        );

        let err_fn = |err| {
            tracing::error!("Audio stream error: {}", err);
        };
        let stream_config: cpal::StreamConfig = device_config.into();

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    sink.consume(data);
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let frames: Vec<f32> =
                        data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    sink.consume(&frames);
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let frames: Vec<f32> = data
                        .iter()
                        .map(|&s| (s as f32 - 32768.0) / 32768.0)
                        .collect();
                    sink.consume(&frames);
                },
                err_fn,
                None,
            )?,
            other => {
                return Err(anyhow::anyhow!(
                    "Unsupported sample format: {other:?}"
                ));
            }
        };

        stream.play()?;
        self.stream = Some(stream);

        tracing::debug!("Audio stream started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            self.level.store(0f32.to_bits(), Ordering::Relaxed);
            tracing::debug!("Audio stream stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sink(slot: HandlerSlot) -> CaptureSink {
        CaptureSink::new(
            2,
            16000,
            16000,
            4,
            slot,
            Arc::new(AtomicU32::new(0)),
            Arc::new(Mutex::new(Vec::new())),
        )
    }

    #[test]
    fn sink_downmixes_stereo_and_chunks() {
        let slot: HandlerSlot = Arc::new(Mutex::new(None));
        let received: Arc<Mutex<Vec<Vec<f32>>>> = Arc::new(Mutex::new(Vec::new()));
        let received_cb = Arc::clone(&received);
        *slot.lock().unwrap() = Some(Box::new(move |chunk: &[f32]| {
            received_cb.lock().unwrap().push(chunk.to_vec());
        }));

        let mut sink = test_sink(Arc::clone(&slot));
        // 4 stereo frames -> 4 mono samples -> one chunk of 4
        sink.consume(&[1.0, 0.0, 0.0, 1.0, 0.5, 0.5, -1.0, -1.0]);

        let chunks = received.lock().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], vec![0.5, 0.5, 0.5, -1.0]);
    }

    #[test]
    fn dropped_subscription_renders_handler_inert() {
        let slot: HandlerSlot = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicU32::new(0));
        let count_cb = Arc::clone(&count);
        *slot.lock().unwrap() = Some(Box::new(move |_: &[f32]| {
            count_cb.fetch_add(1, Ordering::Relaxed);
        }));

        let subscription = BufferSubscription::new(Arc::clone(&slot));
        let mut sink = test_sink(Arc::clone(&slot));

        sink.consume(&[0.1; 8]);
        assert_eq!(count.load(Ordering::Relaxed), 1);

        drop(subscription);
        sink.consume(&[0.1; 8]);
        assert_eq!(count.load(Ordering::Relaxed), 1, "no delivery after drop");
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0; 1600]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_full_scale_square_is_one() {
        let square: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&square) - 1.0).abs() < 1e-6);
    }
}
