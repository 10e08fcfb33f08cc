use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::music::notes::{self, Note};

/// Text shown in place of a note when no range could be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

/// Resolved low/high notes of a session. Both sides are valid or both are
/// unavailable, never a mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocalRange {
    Resolved { low: Note, high: Note },
    NotAvailable,
}

impl VocalRange {
    pub fn notes(&self) -> Option<(Note, Note)> {
        match *self {
            VocalRange::Resolved { low, high } => Some((low, high)),
            VocalRange::NotAvailable => None,
        }
    }

    pub fn midi_bounds(&self) -> Option<(i32, i32)> {
        self.notes().map(|(low, high)| (low.midi(), high.midi()))
    }

    pub fn low_label(&self) -> String {
        self.notes()
            .map_or_else(|| NOT_AVAILABLE.to_string(), |(low, _)| low.to_string())
    }

    pub fn high_label(&self) -> String {
        self.notes()
            .map_or_else(|| NOT_AVAILABLE.to_string(), |(_, high)| high.to_string())
    }
}

impl fmt::Display for VocalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.low_label(), self.high_label())
    }
}

/// Serialized as `{"low": "C3", "high": "G4"}` or `{"low": "N/A", "high": "N/A"}`.
impl Serialize for VocalRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("VocalRange", 2)?;
        s.serialize_field("low", &self.low_label())?;
        s.serialize_field("high", &self.high_label())?;
        s.end()
    }
}

/// Advisory derived from the extremes of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthSignal {
    HighNoteStrain,
    LowNoteChestVoice,
    WideRange,
    NoPitchDetected,
}

impl HealthSignal {
    pub fn message(&self) -> &'static str {
        match self {
            HealthSignal::HighNoteStrain => {
                "Wow, you hit a really high note! Make sure to warm up and don't strain your upper range."
            }
            HealthSignal::LowNoteChestVoice => {
                "You sang super low! Make sure you're not forcing your chest voice; support with proper breath."
            }
            HealthSignal::WideRange => {
                "Huge range! Great job, just remember to pace yourself when stretching both ends."
            }
            HealthSignal::NoPitchDetected => {
                "We couldn't detect a clear pitch. Try singing a longer or more sustained tone."
            }
        }
    }

    /// Rules in priority order, first match wins:
    /// top at or above C6 (84), bottom at or below C3 (48), span over two octaves.
    pub fn from_midi(midi_min: i32, midi_max: i32) -> Option<Self> {
        if midi_max >= 84 {
            Some(HealthSignal::HighNoteStrain)
        } else if midi_min <= 48 {
            Some(HealthSignal::LowNoteChestVoice)
        } else if midi_max - midi_min > 24 {
            Some(HealthSignal::WideRange)
        } else {
            None
        }
    }
}

/// Where the range is read from the sorted observations.
#[derive(Debug, Clone, Copy)]
pub struct RangeConfig {
    pub low_percentile: f64,
    pub high_percentile: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            low_percentile: 0.1,
            high_percentile: 0.9,
        }
    }
}

/// Output of one range resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeEstimate {
    pub range: VocalRange,
    pub health: Option<HealthSignal>,
    /// Trimmed low/high in Hz, when there were observations.
    pub bounds_hz: Option<(f32, f32)>,
    pub observation_count: usize,
}

impl RangeEstimate {
    /// Health text, empty when there is nothing to say.
    pub fn health_message(&self) -> &'static str {
        self.health.map_or("", |h| h.message())
    }

    fn no_signal() -> Self {
        Self {
            range: VocalRange::NotAvailable,
            health: Some(HealthSignal::NoPitchDetected),
            bounds_hz: None,
            observation_count: 0,
        }
    }
}

/// Index `floor(p * n)`, clamped so that p = 1.0 still lands in the slice.
fn percentile_index(len: usize, p: f64) -> usize {
    ((p * len as f64).floor() as usize).min(len - 1)
}

/// Reduce a session's pitch observations to a low/high pair.
///
/// The observations are trimmed at the configured percentiles rather than
/// taking min/max, so octave-jump glitches from the estimator do not set the
/// range. With very few observations both indices can land on the same
/// element and the range collapses to a single note.
pub fn resolve_range(observations: &[f32], config: &RangeConfig) -> RangeEstimate {
    if observations.is_empty() {
        return RangeEstimate::no_signal();
    }

    let mut sorted = observations.to_vec();
    sorted.sort_by(f32::total_cmp);

    let low = sorted[percentile_index(sorted.len(), config.low_percentile)];
    let high = sorted[percentile_index(sorted.len(), config.high_percentile)];

    let (low_note, high_note) = match (notes::frequency_to_note(low), notes::frequency_to_note(high)) {
        (Some(l), Some(h)) => (l, h),
        _ => {
            debug!(low, high, "trimmed bounds have no note, range unavailable");
            return RangeEstimate {
                range: VocalRange::NotAvailable,
                health: None,
                bounds_hz: Some((low, high)),
                observation_count: sorted.len(),
            };
        }
    };

    let (midi_min, midi_max) = (low_note.midi(), high_note.midi());
    debug!(
        observations = sorted.len(),
        low_hz = low,
        high_hz = high,
        midi_min,
        midi_max,
        "resolved vocal range"
    );

    RangeEstimate {
        range: VocalRange::Resolved {
            low: low_note,
            high: high_note,
        },
        health: HealthSignal::from_midi(midi_min, midi_max),
        bounds_hz: Some((low, high)),
        observation_count: sorted.len(),
    }
}
