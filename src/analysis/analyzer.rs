use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::audio::session::{self, SessionSettings, SessionSummary};
use crate::audio::wav;

/// Analyze a recorded WAV file through the same frame pipeline as a live
/// session. The trailing partial frame is analyzed too.
pub fn analyze_file(path: &Path, settings: &SessionSettings) -> Result<SessionSummary> {
    let (samples, spec) = wav::load_samples(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    println!("  {} {}", style(">>").cyan(), path.display());
    let duration = samples.len() as f32 / spec.sample_rate.max(1) as f32;
    println!("     Loaded: {:.1}s, {} Hz", duration, spec.sample_rate);

    let pb = ProgressBar::new(samples.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("  Analyzing {bar:30.green/dim} {percent:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = session::analyze_samples(&samples, spec.sample_rate, settings, |n| {
        pb.set_position(n as u64)
    });
    pb.finish_and_clear();

    info!(
        path = %path.display(),
        frames = summary.stats.frames,
        kept = summary.stats.kept,
        "file analyzed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn write_tone(path: &Path, freq_hz: f32, sample_rate: u32, secs: f32) {
        let mut writer = wav::create_writer(path, wav::recording_spec(sample_rate)).unwrap();
        let n = (sample_rate as f32 * secs) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| 0.5 * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect();
        wav::write_samples(&mut writer, &samples).unwrap();
        writer.finalize().unwrap();
    }

    #[test]
    fn analyzes_recorded_tone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take_001.wav");
        write_tone(&path, 330.0, 44100, 1.5);

        let summary = analyze_file(&path, &SessionSettings::default()).unwrap();
        let (low, high) = summary.estimate.unwrap().range.notes().unwrap();
        assert_eq!(low.to_string(), "E4");
        assert_eq!(high.to_string(), "E4");
    }

    #[test]
    fn short_file_has_no_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_tone(&path, 330.0, 16000, 0.3);

        let summary = analyze_file(&path, &SessionSettings::default()).unwrap();
        assert!(summary.estimate.is_none());
    }

    #[test]
    fn partial_last_frame_is_counted() {
        let settings = SessionSettings {
            frame_size: 1000,
            ..SessionSettings::default()
        };
        let summary = session::analyze_samples(&vec![0.0; 2500], 1000, &settings, |_| {});
        assert_eq!(summary.stats.frames, 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyze_file(&dir.path().join("nope.wav"), &SessionSettings::default());
        assert!(err.is_err());
    }
}
