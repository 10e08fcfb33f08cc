use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Concert pitch reference: A4 = 440 Hz = MIDI 69.
pub const A4_HZ: f32 = 440.0;
pub const A4_MIDI: i32 = 69;

/// Chromatic pitch-class names, starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A pitch class plus octave in scientific pitch notation (e.g. "A4", "C#5").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    /// Index into `NOTE_NAMES`, always 0..=11.
    pub pitch_class: u8,
    pub octave: i32,
}

impl Note {
    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.pitch_class as usize]
    }

    pub fn midi(&self) -> i32 {
        self.pitch_class as i32 + (self.octave + 1) * 12
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteParseError {
    #[error("empty note name")]
    Empty,
    #[error("unknown pitch class in {0:?} (expected C, C#, D, ... B)")]
    UnknownPitchClass(String),
    #[error("note {0:?} must end in a single octave digit, e.g. A4")]
    BadOctave(String),
}

impl FromStr for Note {
    type Err = NoteParseError;

    /// Parses `letter[#]digit`. Flats, lowercase letters and multi-digit
    /// octaves are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NoteParseError::Empty);
        }

        let (name, octave) = s.split_at(s.len() - s.chars().last().map_or(0, char::len_utf8));
        let octave = match octave.chars().next() {
            Some(c) if c.is_ascii_digit() => c as i32 - '0' as i32,
            _ => return Err(NoteParseError::BadOctave(s.to_string())),
        };

        let pitch_class = NOTE_NAMES
            .iter()
            .position(|&n| n == name)
            .ok_or_else(|| NoteParseError::UnknownPitchClass(s.to_string()))?;

        Ok(Note {
            pitch_class: pitch_class as u8,
            octave,
        })
    }
}

/// Round half toward positive infinity, so that x.5 always goes up
/// regardless of sign.
fn round_half_up(x: f32) -> i32 {
    (x + 0.5).floor() as i32
}

/// Signed distance from A4 in whole semitones, or None for frequencies that
/// have no note (zero, negative, NaN, infinite).
fn semitones_from_a4(freq_hz: f32) -> Option<i32> {
    if !freq_hz.is_finite() || freq_hz <= 0.0 {
        return None;
    }
    Some(round_half_up(12.0 * (freq_hz / A4_HZ).log2()))
}

/// Nearest MIDI note number: round(69 + 12 * log2(f / 440)).
///
/// Returns None where `frequency_to_note` would.
pub fn frequency_to_midi(freq_hz: f32) -> Option<i32> {
    semitones_from_a4(freq_hz).map(|s| A4_MIDI + s)
}

/// Equal-tempered frequency of a MIDI note.
pub fn midi_to_frequency(midi: i32) -> f32 {
    A4_HZ * 2.0_f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

/// Nearest note for a frequency. `None` for non-positive or undefined input.
pub fn frequency_to_note(freq_hz: f32) -> Option<Note> {
    frequency_to_midi(freq_hz).map(midi_to_note)
}

/// MIDI number for a note string like "A4" or "C#5". Anything that does not
/// parse is None; callers skip classification rather than fail.
pub fn note_to_midi(note: &str) -> Option<i32> {
    note.parse::<Note>().ok().map(|n| n.midi())
}

/// Inverse of `Note::midi`. Euclidean division keeps negative numbers sane
/// (MIDI 0 is C-1).
pub fn midi_to_note(midi: i32) -> Note {
    Note {
        pitch_class: midi.rem_euclid(12) as u8,
        octave: midi.div_euclid(12) - 1,
    }
}
