use anyhow::{Context, Result};
use console::style;
use serde::Serialize;

use crate::analysis::range::{RangeEstimate, VocalRange};
use crate::audio::session::SessionSummary;
use crate::music::classify::{self, VoiceType};

/// Search strings for the recommendation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Queries {
    pub recommendation: String,
    pub challenge: String,
}

/// Everything the caller needs from one analyzed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    #[serde(flatten)]
    pub range: VocalRange,
    /// Empty when there is nothing to say.
    pub health: String,
    pub voice_type: Option<VoiceType>,
    pub genres: Vec<&'static str>,
    pub range_tag: &'static str,
    pub queries: Queries,
    pub observations: usize,
    pub bounds_hz: Option<(f32, f32)>,
}

impl SessionReport {
    /// Classify a resolved range. The queries use `genre_preference` when
    /// given, otherwise the first suggested genre.
    pub fn build(estimate: &RangeEstimate, genre_preference: Option<&str>) -> Self {
        let range = estimate.range;
        let genres = classify::suggest_genres(&range);
        let range_tag = classify::range_tag(Some(&range));

        let genre = genre_preference
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .or_else(|| genres.first().copied())
            .unwrap_or("");

        Self {
            range,
            health: estimate.health_message().to_string(),
            voice_type: classify::voice_type(&range),
            genres,
            range_tag,
            queries: Queries {
                recommendation: classify::recommendation_query(range_tag, genre),
                challenge: classify::challenge_query(range_tag, genre),
            },
            observations: estimate.observation_count,
            bounds_hz: estimate.bounds_hz,
        }
    }
}

/// JSON shape for a session too short to analyze.
#[derive(Debug, Serialize)]
struct TooShort {
    status: &'static str,
    duration_secs: f32,
}

/// Print a finished session as styled text or pretty JSON.
pub fn print_summary(summary: &SessionSummary, genre: Option<&str>, json: bool) -> Result<()> {
    let Some(estimate) = &summary.estimate else {
        if json {
            let out = TooShort {
                status: "too_short",
                duration_secs: summary.duration.as_secs_f32(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!(
                "{} Recording too short ({:.1}s). Sing for at least a second.",
                style("!").yellow().bold(),
                summary.duration.as_secs_f32()
            );
        }
        return Ok(());
    };

    let report = SessionReport::build(estimate, genre);
    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
    } else {
        print_report(&report, summary);
    }
    Ok(())
}

fn print_report(report: &SessionReport, summary: &SessionSummary) {
    println!();
    println!("{}", style("Vocal Range").bold());
    println!();

    match report.range {
        VocalRange::Resolved { low, high } => {
            print_row("Lowest", &low.to_string());
            print_row("Highest", &high.to_string());
            if let Some((lo, hi)) = report.bounds_hz {
                print_row("In Hz", &format!("{lo:.1} - {hi:.1}"));
            }
        }
        VocalRange::NotAvailable => {
            print_row("Range", &style(report.range.to_string()).dim().to_string());
        }
    }

    if let Some(voice) = report.voice_type {
        print_row("Voice type", &style(voice).cyan().to_string());
    }
    if !report.genres.is_empty() {
        print_row("Genres", &report.genres.join(", "));
    }

    let stats = &summary.stats;
    print_row(
        "Frames",
        &format!(
            "{} total, {} kept, {} quiet, {} unpitched, {} out of band",
            stats.frames, stats.kept, stats.gated, stats.unpitched, stats.out_of_band
        ),
    );

    if !report.health.is_empty() {
        println!();
        println!("  {} {}", style("Note:").yellow().bold(), report.health);
    }

    println!();
    println!("  Try searching for:");
    println!("    {}", style(&report.queries.recommendation).green());
    println!("    {}", style(&report.queries.challenge).green());
}

fn print_row(label: &str, value: &str) {
    println!("  {:12} {}", style(label).bold(), value);
}
