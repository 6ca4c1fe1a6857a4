//! Live input visualizations for the dictation screen.
//!
//! Two ways to show that the microphone is hearing something: a scrolling
//! time-domain level history, and an FFT spectrum of the most recent capture
//! chunk. Both produce 0-100 magnitudes sized to the terminal width, ready
//! for a Sparkline.

use rustfft::{num_complex::Complex, FftPlanner};

/// Scrolling history of per-frame input levels.
pub struct LevelHistory {
    values: Vec<u64>,
    width: usize,
}

impl LevelHistory {
    pub fn new(width: usize) -> Self {
        Self {
            values: vec![0; width],
            width,
        }
    }

    /// Pushes the newest level (0-100), scrolling the oldest one out.
    pub fn push(&mut self, level: u8) {
        self.values.push(level as u64);
        while self.values.len() > self.width {
            self.values.remove(0);
        }
    }

    /// Adjusts the history to a new terminal width, padding with silence.
    pub fn resize(&mut self, width: usize) {
        self.width = width;
        while self.values.len() > width {
            self.values.remove(0);
        }
        while self.values.len() < width {
            self.values.insert(0, 0);
        }
    }

    pub fn data(&self) -> &[u64] {
        &self.values
    }
}

/// Converts an RMS amplitude in [0, 1] to a 0-100 meter percentage.
///
/// Maps dBFS onto a 40 dB range below the configured reference level, the
/// same scaling used for the spectrum bins so the two displays agree.
pub fn level_percent(rms: f32, reference_level_db: i8) -> u8 {
    if rms <= 0.0 {
        return 0;
    }
    let db_fs = 20.0 * rms.log10();
    let min_db = reference_level_db as f32 - 40.0;
    ((db_fs - min_db) / 40.0 * 100.0).clamp(0.0, 100.0) as u8
}

/// Stateful spectrum analyzer with internal FFT planner.
pub struct SpectrumAnalyzer {
    fft_planner: FftPlanner<f32>,
    display_data: Vec<u64>,
    num_bins: usize,
}

impl SpectrumAnalyzer {
    /// Creates a new spectrum analyzer.
    pub fn new(num_bins: usize) -> Self {
        Self {
            fft_planner: FftPlanner::new(),
            display_data: vec![0u64; num_bins],
            num_bins,
        }
    }

    /// Updates spectrum with the latest capture chunk, applying smoothing.
    pub fn update(&mut self, samples: &[f32], sample_rate: u32, reference_level_db: i8) {
        let new_bins = calculate_spectrum(
            samples,
            sample_rate,
            self.num_bins,
            reference_level_db,
            &mut self.fft_planner,
        );

        // Apply moving average smoothing to reduce visual jitter
        for (old_val, new_val) in self.display_data.iter_mut().zip(new_bins.iter()) {
            *old_val = (*old_val + *new_val) / 2;
        }
    }

    /// Resizes the analyzer for a new terminal width.
    pub fn resize(&mut self, new_width: usize) {
        self.num_bins = new_width;
        self.display_data = vec![0u64; new_width];
    }

    /// Returns the current display data.
    pub fn data(&self) -> &[u64] {
        &self.display_data
    }
}

/// Calculates frequency spectrum from a capture chunk using FFT.
///
/// Returns magnitudes normalized to 0-100, matching the level meter scaling.
/// Focuses on 100-1500 Hz (human voice fundamentals and harmonics).
fn calculate_spectrum(
    samples: &[f32],
    sample_rate: u32,
    num_bins: usize,
    reference_level_db: i8,
    fft_planner: &mut FftPlanner<f32>,
) -> Vec<u64> {
    if samples.is_empty() || num_bins == 0 {
        return vec![0u64; num_bins];
    }

    let fft_size = 2048;
    let sample_count = samples.len().min(fft_size);
    let recent_samples = &samples[samples.len() - sample_count..];

    // Apply Hanning window to reduce spectral leakage
    let mut buffer: Vec<Complex<f32>> = recent_samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let window = 0.5
                * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / sample_count as f32).cos());
            Complex::new(s * window, 0.0)
        })
        .collect();

    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let fft = fft_planner.plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    let freq_resolution = sample_rate as f32 / fft_size as f32;

    // Core human voice range
    let min_freq = 100.0;
    let max_freq = 1500.0;

    let min_bin = (min_freq / freq_resolution) as usize;
    let max_bin = (max_freq / freq_resolution).min((fft_size / 2) as f32) as usize;

    let noise_gate_db = reference_level_db as f32 - 35.0;

    // Distribute FFT bins evenly across display width
    let useful_bins = max_bin.saturating_sub(min_bin).max(1);
    let mut result = vec![0u64; num_bins];

    for (display_idx, result_bin) in result.iter_mut().enumerate() {
        let start_bin = min_bin + (display_idx * useful_bins) / num_bins;
        let end_bin = (min_bin + ((display_idx + 1) * useful_bins) / num_bins)
            .min(max_bin)
            .max(start_bin + 1);

        if start_bin >= max_bin {
            break;
        }

        let mut sum = 0.0;
        let mut count = 0;
        for bin_idx in start_bin..end_bin {
            if bin_idx < buffer.len() / 2 {
                sum += buffer[bin_idx].norm();
                count += 1;
            }
        }

        if count > 0 {
            let avg_magnitude = sum / count as f32;

            let db = if avg_magnitude > 1e-10 {
                20.0 * avg_magnitude.log10()
            } else {
                -100.0
            };

            // Reduce by 20 dB to align FFT energy concentration with RMS volume
            let adjusted_db = db - 20.0;

            if adjusted_db >= noise_gate_db {
                let db_range = reference_level_db as f32 - noise_gate_db;
                let normalized =
                    ((adjusted_db - noise_gate_db) / db_range * 100.0).clamp(0.0, 100.0);
                *result_bin = normalized as u64;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_percent_silence_is_zero() {
        assert_eq!(level_percent(0.0, -20), 0);
    }

    #[test]
    fn level_percent_at_reference_is_full() {
        // -20 dBFS equals an RMS of 0.1
        assert_eq!(level_percent(0.1, -20), 100);
    }

    #[test]
    fn history_scrolls_and_resizes() {
        let mut history = LevelHistory::new(3);
        history.push(10);
        history.push(20);
        assert_eq!(history.data(), &[0, 10, 20]);

        history.push(30);
        history.push(40);
        assert_eq!(history.data(), &[20, 30, 40]);

        history.resize(5);
        assert_eq!(history.data(), &[0, 0, 20, 30, 40]);

        history.resize(2);
        assert_eq!(history.data(), &[30, 40]);
    }

    #[test]
    fn spectrum_of_tone_has_energy() {
        let mut analyzer = SpectrumAnalyzer::new(40);
        // 400 Hz tone at a healthy level, one capture chunk long
        let samples: Vec<f32> = (0..1600)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 400.0 * i as f32 / 16000.0).sin())
            .collect();
        analyzer.update(&samples, 16000, -20);
        assert!(analyzer.data().iter().any(|&v| v > 0));
    }

    #[test]
    fn spectrum_of_silence_is_flat() {
        let mut analyzer = SpectrumAnalyzer::new(40);
        analyzer.update(&[0.0; 1600], 16000, -20);
        assert!(analyzer.data().iter().all(|&v| v == 0));
    }
}
