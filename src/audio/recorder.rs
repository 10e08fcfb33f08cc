use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use console::style;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::music::notes;

use super::capture::{self, LiveMeter};
use super::session::{self, SessionSettings, SessionSummary, TakeWriter};

/// Capture options that are not part of the analysis itself.
pub struct RecordOptions {
    pub device: String,
    pub queue_frames: usize,
    pub save_to: Option<PathBuf>,
}

/// Record one live session and return its summary.
///
/// Architecture:
///   cpal callback (audio thread)
///     → fixed-size frames over a bounded channel (blocks when full)
///       → analysis thread: gate + pitch per frame, optional WAV writer
///   Enter keypress (main thread) → stop capture → analysis drains and resolves
pub fn record_session(settings: &SessionSettings, opts: &RecordOptions) -> Result<SessionSummary> {
    println!(
        "Sing from your {} comfortable note to your {}.",
        style("lowest").cyan(),
        style("highest").cyan()
    );
    println!("Press {} to start recording.", style("Enter").green().bold());
    wait_for_enter(|| {})?;

    let (capture, frames) =
        capture::start_capture(&opts.device, settings.frame_size, opts.queue_frames)?;

    // Open the output before the user starts singing so a bad path fails now.
    let take = match &opts.save_to {
        Some(path) => match TakeWriter::create(path.clone(), capture.sample_rate) {
            Ok(take) => Some(take),
            Err(e) => {
                // Close the receiver first so the sink's final send cannot block.
                drop(frames);
                capture.stop();
                return Err(e);
            }
        },
        None => None,
    };

    println!(
        "{} on {} ({} Hz). Press {} to stop.",
        style("*** RECORDING ***").red().bold(),
        style(&capture.device_name).cyan(),
        capture.sample_rate,
        style("Enter").bold()
    );

    let consumer = session::spawn_consumer(
        frames,
        settings.clone(),
        capture.sample_rate,
        capture.meter.clone(),
        take,
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("  {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let meter = capture.meter.clone();
    wait_for_enter(|| {
        spinner.set_message(live_status(&meter));
        spinner.tick();
    })?;
    spinner.finish_and_clear();

    capture.stop();
    let summary = consumer
        .join()
        .map_err(|_| anyhow::anyhow!("Analysis thread panicked"))?;

    println!("{}", style("*** STOPPED ***").dim());
    match (&summary.saved_to, &opts.save_to) {
        (Some(path), _) => println!("  Saved to {}", style(path.display()).green()),
        (None, Some(path)) => println!(
            "  {} Could not save {} (see log)",
            style("!").yellow().bold(),
            path.display()
        ),
        (None, None) => {}
    }
    info!(duration_secs = summary.duration.as_secs_f32(), "session recorded");

    Ok(summary)
}

/// One-line level/pitch readout for the spinner.
fn live_status(meter: &LiveMeter) -> String {
    let level = meter.rms_db();
    let level = if level.is_finite() {
        format!("{level:>6.1} dB")
    } else {
        "  -inf dB".to_string()
    };
    let note = meter
        .pitch_hz()
        .and_then(|hz| notes::frequency_to_note(hz).map(|n| format!("{n:<3} {hz:>7.1} Hz")))
        .unwrap_or_else(|| "---".to_string());
    format!("level {level}   last note {note}")
}

/// Block until the user presses Enter, calling `on_tick` every ~100 ms.
pub fn wait_for_enter(mut on_tick: impl FnMut()) -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;

    let result = (|| -> Result<()> {
        loop {
            on_tick();
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && key.code == KeyCode::Enter {
                        return Ok(());
                    }
                }
            }
        }
    })();

    crossterm::terminal::disable_raw_mode()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn status_without_signal() {
        let meter = LiveMeter::default();
        let status = live_status(&meter);
        assert!(status.contains("-inf dB"));
        assert!(status.ends_with("---"));
    }

    #[test]
    fn status_shows_last_note() {
        let meter = LiveMeter::default();
        meter.rms.store(0.1_f32.to_bits(), Ordering::Relaxed);
        meter.pitch.store(440.0_f32.to_bits(), Ordering::Relaxed);
        let status = live_status(&meter);
        assert!(status.contains("-20.0 dB"));
        assert!(status.contains("A4"));
        assert!(status.contains("440.0 Hz"));
    }
}
