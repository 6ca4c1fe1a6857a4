//! Pulse animation state for the microphone indicator.
//!
//! While recording, the indicator breathes between 0.9x and 1.1x of its
//! rest size over a 1.6 second cycle. At rest the scale is exactly 1.0;
//! stopping snaps back to rest immediately.

use std::time::{Duration, Instant};

/// One full in-and-out breath.
const PULSE_PERIOD: Duration = Duration::from_millis(1600);

/// Scale amplitude around the rest size.
const PULSE_AMPLITUDE: f32 = 0.1;

/// Tick-driven scale animation for the recording indicator.
#[derive(Debug, Default)]
pub struct PulseAnimation {
    started: Option<Instant>,
}

impl PulseAnimation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts pulsing from the rest position.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stops pulsing and returns the indicator to rest scale.
    pub fn stop(&mut self) {
        self.started = None;
    }

    /// Returns whether the animation is running.
    pub fn is_active(&self) -> bool {
        self.started.is_some()
    }

    /// Current scale factor: 1.0 at rest, 0.9–1.1 while pulsing.
    pub fn scale(&self) -> f32 {
        match self.started {
            Some(started) => {
                let elapsed = started.elapsed().as_secs_f32();
                let period = PULSE_PERIOD.as_secs_f32();
                let phase = (elapsed / period) * std::f32::consts::TAU;
                1.0 + PULSE_AMPLITUDE * phase.sin()
            }
            None => 1.0,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_scale_is_exactly_one() {
        let pulse = PulseAnimation::new();
        assert_eq!(pulse.scale(), 1.0);
    }

    #[test]
    fn stop_returns_to_rest_scale() {
        let mut pulse = PulseAnimation::new();
        pulse.start();
        assert!(pulse.is_active());
        pulse.stop();
        assert!(!pulse.is_active());
        assert_eq!(pulse.scale(), 1.0);
    }

    #[test]
    fn active_scale_stays_in_band() {
        let mut pulse = PulseAnimation::new();
        pulse.start();
        let scale = pulse.scale();
        assert!((0.9..=1.1).contains(&scale));
    }
}
