use std::fmt;

use serde::Serialize;

use crate::analysis::range::VocalRange;

/// Coarse voice classification by the top of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoiceType {
    Soprano,
    #[serde(rename = "Mezzo-Soprano")]
    MezzoSoprano,
    Alto,
    Tenor,
    Bass,
}

impl VoiceType {
    pub fn label(&self) -> &'static str {
        match self {
            VoiceType::Soprano => "Soprano",
            VoiceType::MezzoSoprano => "Mezzo-Soprano",
            VoiceType::Alto => "Alto",
            VoiceType::Tenor => "Tenor",
            VoiceType::Bass => "Bass",
        }
    }

    /// Thresholds on the highest MIDI note, first match wins:
    /// A5 (81), F5 (77), C4 (60), C3 (48).
    pub fn from_high_midi(high_midi: i32) -> Self {
        match high_midi {
            m if m >= 81 => VoiceType::Soprano,
            m if m >= 77 => VoiceType::MezzoSoprano,
            m if m >= 60 => VoiceType::Alto,
            m if m >= 48 => VoiceType::Tenor,
            _ => VoiceType::Bass,
        }
    }
}

impl fmt::Display for VoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Voice type for a resolved range; None when the range is not available.
pub fn voice_type(range: &VocalRange) -> Option<VoiceType> {
    range
        .midi_bounds()
        .map(|(_, high)| VoiceType::from_high_midi(high))
}

const LOW_GENRES: [&str; 3] = ["jazz", "R&B", "soul"];
const MID_GENRES: [&str; 3] = ["pop", "folk", "musical theatre"];
const HIGH_GENRES: [&str; 3] = ["classical", "opera", "electronic"];

/// Maximum number of genre suggestions returned.
pub const MAX_GENRES: usize = 3;

/// Up to three genres that sit well around the middle of the range.
pub fn suggest_genres(range: &VocalRange) -> Vec<&'static str> {
    let Some((low, high)) = range.midi_bounds() else {
        return Vec::new();
    };
    genres_for_midpoint((low + high) as f32 / 2.0)
}

fn genres_for_midpoint(avg_midi: f32) -> Vec<&'static str> {
    let pool: &[&str] = if avg_midi < 55.0 {
        &LOW_GENRES
    } else if avg_midi < 70.0 {
        &MID_GENRES
    } else {
        &HIGH_GENRES
    };

    let mut genres: Vec<&'static str> = Vec::with_capacity(MAX_GENRES);
    for &g in pool {
        if !genres.contains(&g) {
            genres.push(g);
        }
    }
    genres.truncate(MAX_GENRES);
    genres
}

/// Tag used when there is no usable range at all.
pub const GENERAL_TAG: &str = "general vocal";
/// Tag used when the range matches none of the known shapes.
pub const FALLBACK_TAG: &str = "vocal warm up";

/// (low note prefix, high note prefix, tag). First match wins.
const RANGE_TAGS: &[(&str, &str, &str)] = &[
    ("E2", "E4", "bass vocal"),
    ("A2", "A4", "baritone vocal"),
    ("C3", "G4", "deep alto vocal"),
    ("C3", "C5", "tenor vocal"),
    ("F3", "F5", "alto vocal"),
    ("A3", "A5", "mezzo soprano vocal"),
    ("C4", "C6", "soprano vocal"),
];

/// Free-text tag describing the range, for the recommendation search.
pub fn range_tag(range: Option<&VocalRange>) -> &'static str {
    let Some((low, high)) = range.and_then(VocalRange::notes) else {
        return GENERAL_TAG;
    };
    let (low, high) = (low.to_string(), high.to_string());

    RANGE_TAGS
        .iter()
        .find(|(lo, hi, _)| low.starts_with(lo) && high.starts_with(hi))
        .map(|&(_, _, tag)| tag)
        .unwrap_or(FALLBACK_TAG)
}

/// Search text for songs that suit the range: "<tag> <genre>".
pub fn recommendation_query(tag: &str, genre: &str) -> String {
    format!("{tag} {genre}").trim().to_string()
}

/// Search text for a song that stretches the top of the range.
pub fn challenge_query(tag: &str, genre: &str) -> String {
    format!("{tag} high note {genre}").trim().to_string()
}
