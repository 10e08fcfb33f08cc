/// Default RMS threshold below which a frame is treated as silence.
/// Configurable as `analysis.energy_threshold`.
pub const DEFAULT_ENERGY_THRESHOLD: f32 = 0.005;

#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Linear RMS (not dB). Frames at or above this are analyzed.
    pub energy_threshold: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
        }
    }
}

/// Energy gate in front of the pitch estimator. Keeps silence and breath
/// noise from reaching it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameGate {
    config: GateConfig,
}

impl FrameGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn should_analyze(&self, frame: &[f32]) -> bool {
        rms(frame) >= self.config.energy_threshold
    }
}

/// RMS of a sample buffer (linear). Empty buffers are 0.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * 220.0 * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn rms_of_dc() {
        assert!((rms(&[0.5, 0.5, 0.5, 0.5]) - 0.5).abs() < 1e-6);
        assert!((rms(&[1.0, -1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rms_of_empty_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn silence_is_rejected() {
        let gate = FrameGate::default();
        assert!(!gate.should_analyze(&vec![0.0; 2048]));
        assert!(!gate.should_analyze(&[]));
    }

    #[test]
    fn sung_tone_passes() {
        // Sine RMS = amplitude / sqrt(2) ≈ 0.07
        let gate = FrameGate::default();
        assert!(gate.should_analyze(&sine(0.1, 2048)));
    }

    #[test]
    fn threshold_is_inclusive() {
        let gate = FrameGate::new(GateConfig {
            energy_threshold: 0.25,
        });
        assert!(gate.should_analyze(&[0.25; 16]));
        assert!(!gate.should_analyze(&[0.24; 16]));
    }

    #[test]
    fn threshold_is_tunable() {
        // ~0.0071 RMS: above the 0.005 default, below a stricter 0.02
        let quiet = sine(0.01, 2048);
        assert!(FrameGate::default().should_analyze(&quiet));
        let strict = FrameGate::new(GateConfig {
            energy_threshold: 0.02,
        });
        assert!(!strict.should_analyze(&quiet));
    }
}
