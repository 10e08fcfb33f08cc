use std::str::FromStr;

use console::style;
use thiserror::Error;

use super::notes::{self, Note, NoteParseError};

/// What the user typed for `lyra note`.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteQuery {
    /// "440" or "440hz"
    Frequency(f32),
    /// "m69"
    Midi(i32),
    /// "A4", "C#3", as typed
    Name(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("frequency must be a positive number of Hz, got {0:?}")]
    BadFrequency(String),
    #[error("MIDI number must be 0-127, got {0:?}")]
    BadMidi(String),
    #[error(transparent)]
    BadNote(#[from] NoteParseError),
}

impl FromStr for NoteQuery {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();

        if let Some(num) = lower.strip_prefix('m') {
            return match num.parse::<i32>() {
                Ok(m) if (0..=127).contains(&m) => Ok(NoteQuery::Midi(m)),
                _ => Err(LookupError::BadMidi(s.to_string())),
            };
        }

        let hz_text = lower.strip_suffix("hz").unwrap_or(&lower).trim_end();
        if hz_text.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-') {
            return match hz_text.parse::<f32>() {
                Ok(hz) if hz.is_finite() && hz > 0.0 => Ok(NoteQuery::Frequency(hz)),
                _ => Err(LookupError::BadFrequency(s.to_string())),
            };
        }

        // Parsed here only for the typed error; resolution goes through MIDI.
        s.parse::<Note>()?;
        Ok(NoteQuery::Name(s.to_string()))
    }
}

/// A query resolved to all three representations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteInfo {
    pub note: Note,
    pub midi: i32,
    /// Equal-tempered frequency of `note`.
    pub note_hz: f32,
    /// The frequency that was asked about, when the query was one.
    pub query_hz: Option<f32>,
}

impl NoteInfo {
    /// Offset of the queried frequency from the nearest note, in cents.
    pub fn cents_off(&self) -> Option<f32> {
        self.query_hz
            .map(|hz| 1200.0 * (hz / self.note_hz).log2())
    }
}

pub fn resolve(query: NoteQuery) -> Option<NoteInfo> {
    let (midi, query_hz) = match query {
        NoteQuery::Frequency(hz) => (notes::frequency_to_midi(hz)?, Some(hz)),
        NoteQuery::Midi(m) => (m, None),
        NoteQuery::Name(name) => (notes::note_to_midi(&name)?, None),
    };
    Some(NoteInfo {
        note: notes::midi_to_note(midi),
        midi,
        note_hz: notes::midi_to_frequency(midi),
        query_hz,
    })
}

pub fn print_note_info(info: &NoteInfo) {
    println!("  {:8} {}", style("Note").bold(), style(info.note).cyan().bold());
    println!("  {:8} {}", style("MIDI").bold(), info.midi);
    println!("  {:8} {:.2} Hz", style("Freq").bold(), info.note_hz);
    if let Some(cents) = info.cents_off() {
        println!("  {:8} {:+.1} cents", style("Offset").bold(), cents);
    }
}
