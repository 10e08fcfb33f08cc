use tracing::trace;

use crate::dsp::gate::FrameGate;
use crate::dsp::pitch::PitchEstimator;

/// Plausible band for a sung fundamental. Both ends are exclusive.
#[derive(Debug, Clone, Copy)]
pub struct BandConfig {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            min_hz: 65.0,
            max_hz: 1200.0,
        }
    }
}

impl BandConfig {
    pub fn contains(&self, hz: f32) -> bool {
        hz > self.min_hz && hz < self.max_hz
    }
}

/// Pitch observations for one recording session, in arrival order.
///
/// Append-only while the session runs; read by the range estimator when
/// it stops.
#[derive(Debug, Default, Clone)]
pub struct ObservationBuffer {
    values: Vec<f32>,
}

impl ObservationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, hz: f32) {
        self.values.push(hz);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

}

/// Per-session frame counters, logged when the session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: usize,
    pub gated: usize,
    pub unpitched: usize,
    pub out_of_band: usize,
    pub kept: usize,
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Below the energy gate; the estimator was not called.
    Gated,
    /// The estimator found no pitch.
    Unpitched,
    /// A pitch outside the vocal band (octave error or noise).
    OutOfBand(f32),
    Kept(f32),
}

/// Gates frames, runs the estimator on the survivors and keeps in-band pitches.
#[derive(Debug, Clone, Default)]
pub struct PitchAggregator {
    gate: FrameGate,
    band: BandConfig,
    stats: FrameStats,
}

impl PitchAggregator {
    pub fn new(gate: FrameGate, band: BandConfig) -> Self {
        Self {
            gate,
            band,
            stats: FrameStats::default(),
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Process one frame. Frames are independent; a miss is not an error.
    pub fn process_frame(
        &mut self,
        frame: &[f32],
        sample_rate: u32,
        estimator: &mut dyn PitchEstimator,
        observations: &mut ObservationBuffer,
    ) -> FrameOutcome {
        self.stats.frames += 1;

        if !self.gate.should_analyze(frame) {
            self.stats.gated += 1;
            return FrameOutcome::Gated;
        }

        let outcome = match estimator.estimate(frame, sample_rate) {
            None => {
                self.stats.unpitched += 1;
                FrameOutcome::Unpitched
            }
            Some(hz) if self.band.contains(hz) => {
                observations.push(hz);
                self.stats.kept += 1;
                FrameOutcome::Kept(hz)
            }
            Some(hz) => {
                self.stats.out_of_band += 1;
                FrameOutcome::OutOfBand(hz)
            }
        };

        trace!(?outcome, "frame processed");
        outcome
    }
}
