use std::f64::consts::PI;

use pitch_detection::detector::autocorrelation::AutocorrelationDetector;
use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;
use serde::{Deserialize, Serialize};

/// Fundamental-frequency estimator for one fixed-size frame.
///
/// Implementations may keep scratch buffers between calls, so an estimator
/// is built for one session and dropped when it ends. `None` means no pitch
/// was found, which is normal for unvoiced frames.
pub trait PitchEstimator {
    fn estimate(&mut self, frame: &[f32], sample_rate: u32) -> Option<f32>;
}

/// Which detector from `pitch_detection` to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// McLeod Pitch Method: normalized autocorrelation, robust to harmonics.
    #[default]
    Mcleod,
    /// Plain autocorrelation. Cheaper, more prone to octave errors.
    Autocorrelation,
}

/// Configuration for pitch estimation.
#[derive(Debug, Clone)]
pub struct PitchConfig {
    pub estimator: EstimatorKind,

    /// Detector power threshold. Frames quieter than this return no pitch.
    /// The energy gate already drops silence, so this stays low.
    pub power_threshold: f64,

    /// How periodic a frame must be (0.0-1.0) before a pitch is reported.
    pub clarity_threshold: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorKind::Mcleod,
            power_threshold: 0.01,
            clarity_threshold: 0.5,
        }
    }
}

impl EstimatorKind {
    /// Build an estimator sized for `frame_size` samples.
    pub fn build(self, frame_size: usize, config: &PitchConfig) -> Box<dyn PitchEstimator> {
        match self {
            EstimatorKind::Mcleod => Box::new(DetectorEstimator::new(
                McLeodDetector::new(frame_size, frame_size / 2),
                frame_size,
                config,
            )),
            EstimatorKind::Autocorrelation => Box::new(DetectorEstimator::new(
                AutocorrelationDetector::new(frame_size, frame_size / 2),
                frame_size,
                config,
            )),
        }
    }
}

/// Adapts a `pitch_detection` detector to `PitchEstimator`.
///
/// Frames are copied into a reusable f64 buffer of the detector's size and
/// Hann-windowed over their own length; short frames are zero-padded after
/// windowing, long ones truncated.
pub struct DetectorEstimator<D> {
    detector: D,
    window: Vec<f64>,
    buffer: Vec<f64>,
    power_threshold: f64,
    clarity_threshold: f64,
}

impl<D: PitchDetector<f64>> DetectorEstimator<D> {
    pub fn new(detector: D, frame_size: usize, config: &PitchConfig) -> Self {
        Self {
            detector,
            window: hann_window(frame_size),
            buffer: vec![0.0; frame_size],
            power_threshold: config.power_threshold,
            clarity_threshold: config.clarity_threshold,
        }
    }
}

impl<D: PitchDetector<f64>> PitchEstimator for DetectorEstimator<D> {
    fn estimate(&mut self, frame: &[f32], sample_rate: u32) -> Option<f32> {
        let n = frame.len().min(self.buffer.len());
        // A short tail frame gets its own window so both ends taper.
        let short_window;
        let window = if n == self.window.len() {
            &self.window
        } else {
            short_window = hann_window(n);
            &short_window
        };
        for (dst, (&s, &w)) in self.buffer.iter_mut().zip(frame.iter().zip(window)) {
            *dst = s as f64 * w;
        }
        self.buffer[n..].fill(0.0);

        self.detector
            .get_pitch(
                &self.buffer,
                sample_rate as usize,
                self.power_threshold,
                self.clarity_threshold,
            )
            .map(|p| p.frequency as f32)
            .filter(|f| f.is_finite())
    }
}

/// Hann window coefficients: w(n) = 0.5 * (1 - cos(2πn / (N - 1))).
fn hann_window(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let scale = 2.0 * PI / (len - 1) as f64;
    (0..len)
        .map(|i| 0.5 * (1.0 - (scale * i as f64).cos()))
        .collect()
}
