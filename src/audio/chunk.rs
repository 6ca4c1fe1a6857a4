//! Sample-rate decimation and fixed-length chunk assembly.
//!
//! Audio devices deliver frames at their native rate in arbitrary slice
//! sizes. The speech engine wants exact 1600-sample chunks of 16kHz mono.
//! These two small state machines bridge the gap inside the capture callback.

/// Decimating resampler from a device rate down to the engine rate.
///
/// Uses integer-ratio decimation with window averaging, which is adequate
/// for voice. Samples that don't fill a whole window are carried over to
/// the next call, so no audio is lost across callback boundaries.
pub struct Decimator {
    ratio: usize,
    carry: Vec<f32>,
}

impl Decimator {
    /// Creates a decimator from `input_rate` down to `output_rate`.
    ///
    /// A ratio that rounds to 1 (input at or near the output rate) makes
    /// this a passthrough.
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        let ratio = (input_rate as f32 / output_rate as f32).round().max(1.0) as usize;

        if ratio > 1 && input_rate != ratio as u32 * output_rate {
            tracing::warn!(
                "Device rate {}Hz is not an integer multiple of {}Hz; effective rate will be {}Hz",
                input_rate,
                output_rate,
                input_rate / ratio as u32
            );
        }

        Self {
            ratio,
            carry: Vec::new(),
        }
    }

    /// Feeds mono samples at the input rate, returning samples at the output rate.
    pub fn feed(&mut self, mono: &[f32]) -> Vec<f32> {
        if self.ratio <= 1 {
            return mono.to_vec();
        }

        self.carry.extend_from_slice(mono);

        let output_len = self.carry.len() / self.ratio;
        if output_len == 0 {
            return Vec::new();
        }

        let mut output = Vec::with_capacity(output_len);
        for i in 0..output_len {
            let start = i * self.ratio;
            let window = &self.carry[start..start + self.ratio];
            output.push(window.iter().sum::<f32>() / self.ratio as f32);
        }

        self.carry.drain(0..output_len * self.ratio);
        output
    }
}

/// Re-buffers arbitrary sample slices into exact fixed-length chunks.
pub struct ChunkAssembler {
    chunk_len: usize,
    pending: Vec<f32>,
}

impl ChunkAssembler {
    /// Creates an assembler emitting chunks of exactly `chunk_len` samples.
    pub fn new(chunk_len: usize) -> Self {
        Self {
            chunk_len,
            pending: Vec::with_capacity(chunk_len),
        }
    }

    /// Feeds samples, invoking `emit` once per completed chunk.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(&[f32])) {
        self.pending.extend_from_slice(samples);

        while self.pending.len() >= self.chunk_len {
            {
                let chunk = &self.pending[..self.chunk_len];
                emit(chunk);
            }
            self.pending.drain(0..self.chunk_len);
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembler_emits_exact_chunks_across_splits() {
        let mut assembler = ChunkAssembler::new(4);
        let mut chunks: Vec<Vec<f32>> = Vec::new();

        assembler.push(&[1.0, 2.0, 3.0], |c| chunks.push(c.to_vec()));
        assert!(chunks.is_empty());

        assembler.push(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], |c| chunks.push(c.to_vec()));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(chunks[1], vec![5.0, 6.0, 7.0, 8.0]);

        // The ninth sample stays pending until more audio arrives
        assembler.push(&[10.0, 11.0, 12.0], |c| chunks.push(c.to_vec()));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], vec![9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn decimator_passthrough_at_engine_rate() {
        let mut decimator = Decimator::new(16000, 16000);
        let out = decimator.feed(&[0.1, 0.2, 0.3]);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn decimator_averages_3_to_1() {
        // 48kHz -> 16kHz is a 3:1 ratio
        let mut decimator = Decimator::new(48000, 16000);
        let out = decimator.feed(&[0.0, 0.3, 0.6, 1.0, 1.0, 1.0]);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decimator_carries_remainder_between_calls() {
        let mut decimator = Decimator::new(48000, 16000);
        assert!(decimator.feed(&[0.3, 0.3]).is_empty());
        let out = decimator.feed(&[0.3]);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn decimator_sample_count_over_a_second() {
        let mut decimator = Decimator::new(48000, 16000);
        let second = vec![0.5f32; 48000];
        let out = decimator.feed(&second);
        assert_eq!(out.len(), 16000);
    }
}
