use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::analysis::aggregator::{
    BandConfig, FrameOutcome, FrameStats, ObservationBuffer, PitchAggregator,
};
use crate::analysis::range::{self, RangeConfig, RangeEstimate};
use crate::audio::capture::LiveMeter;
use crate::audio::frames::AudioFrame;
use crate::audio::wav;
use crate::dsp::gate::{FrameGate, GateConfig};
use crate::dsp::pitch::{PitchConfig, PitchEstimator};

/// Everything a session needs to turn frames into a range.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub frame_size: usize,
    pub gate: GateConfig,
    pub band: BandConfig,
    pub pitch: PitchConfig,
    pub range: RangeConfig,
    /// Sessions with less audio than this are not resolved.
    pub min_duration: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            gate: GateConfig::default(),
            band: BandConfig::default(),
            pitch: PitchConfig::default(),
            range: RangeConfig::default(),
            min_duration: Duration::from_millis(800),
        }
    }
}

/// Result of a finished session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Audio delivered to the session.
    pub duration: Duration,
    pub stats: FrameStats,
    /// None when the session was shorter than `min_duration`.
    pub estimate: Option<RangeEstimate>,
    /// Where the take was written, if saving was requested and succeeded.
    pub saved_to: Option<PathBuf>,
}

/// One recording session: owns the estimator and the observation buffer.
///
/// Single writer: frames are fed in order on one thread, and `finish`
/// consumes the session so nothing can be appended after the range is read.
pub struct Session {
    sample_rate: u32,
    settings: SessionSettings,
    estimator: Box<dyn PitchEstimator>,
    aggregator: PitchAggregator,
    observations: ObservationBuffer,
    samples_seen: usize,
}

impl Session {
    pub fn new(settings: SessionSettings, sample_rate: u32) -> Self {
        let estimator = settings
            .pitch
            .estimator
            .build(settings.frame_size, &settings.pitch);
        Self::with_estimator(settings, sample_rate, estimator)
    }

    pub fn with_estimator(
        settings: SessionSettings,
        sample_rate: u32,
        estimator: Box<dyn PitchEstimator>,
    ) -> Self {
        let aggregator = PitchAggregator::new(FrameGate::new(settings.gate), settings.band);
        Self {
            sample_rate,
            settings,
            estimator,
            aggregator,
            observations: ObservationBuffer::new(),
            samples_seen: 0,
        }
    }

    pub fn process(&mut self, frame: &[f32]) -> FrameOutcome {
        self.samples_seen += frame.len();
        self.aggregator.process_frame(
            frame,
            self.sample_rate,
            self.estimator.as_mut(),
            &mut self.observations,
        )
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples_seen as f64 / self.sample_rate as f64)
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    /// End the session: drop the estimator and resolve the range from the
    /// buffered observations.
    pub fn finish(self) -> SessionSummary {
        let duration = self.duration();
        let stats = self.aggregator.stats();
        debug!(?stats, ?duration, "session finished");

        let estimate = if duration < self.settings.min_duration {
            warn!(
                duration_ms = duration.as_millis() as u64,
                min_ms = self.settings.min_duration.as_millis() as u64,
                "session too short, skipping range estimation"
            );
            None
        } else {
            if self.observations.is_empty() {
                debug!("no pitched frames in session");
            }
            Some(range::resolve_range(
                self.observations.as_slice(),
                &self.settings.range,
            ))
        };

        SessionSummary {
            duration,
            stats,
            estimate,
            saved_to: None,
        }
    }
}

/// Run a whole in-memory recording through a session.
///
/// `on_frame` is called after each frame with the number of samples
/// consumed so far (used for progress reporting).
pub fn analyze_samples(
    samples: &[f32],
    sample_rate: u32,
    settings: &SessionSettings,
    mut on_frame: impl FnMut(usize),
) -> SessionSummary {
    let mut session = Session::new(settings.clone(), sample_rate);
    let mut consumed = 0;

    for frame in samples.chunks(settings.frame_size.max(1)) {
        session.process(frame);
        consumed += frame.len();
        on_frame(consumed);
    }

    session.finish()
}

/// An open WAV file the live take is copied into.
pub struct TakeWriter {
    pub path: PathBuf,
    pub writer: wav::FileWriter,
}

impl TakeWriter {
    /// Create the file up front so a bad path fails before recording starts.
    pub fn create(path: PathBuf, sample_rate: u32) -> Result<Self> {
        let writer = wav::create_writer(&path, wav::recording_spec(sample_rate))?;
        Ok(Self { path, writer })
    }
}

/// Spawn the analysis thread for a live capture.
///
/// The thread builds its own session, drains `frames` until the sender side
/// is dropped, then resolves the range. Frames still queued when capture
/// stops are processed before resolving. If `take` is set, the same audio is
/// written there as 16-bit WAV; a write error stops the saving but never the
/// analysis.
pub fn spawn_consumer(
    frames: Receiver<AudioFrame>,
    settings: SessionSettings,
    sample_rate: u32,
    meter: Arc<LiveMeter>,
    take: Option<TakeWriter>,
) -> JoinHandle<SessionSummary> {
    thread::spawn(move || {
        info!(sample_rate, frame_size = settings.frame_size, "analysis thread started");

        let mut take = take;
        let mut session = Session::new(settings, sample_rate);
        for frame in frames.iter() {
            if frame.sample_rate != sample_rate {
                warn!(
                    expected = sample_rate,
                    got = frame.sample_rate,
                    "frame sample rate changed mid-session"
                );
            }
            if let Some(t) = take.as_mut() {
                if let Err(e) = wav::write_samples(&mut t.writer, &frame.samples) {
                    warn!(path = %t.path.display(), "saving stopped: {e:#}");
                    take = None;
                }
            }
            if let FrameOutcome::Kept(hz) = session.process(&frame.samples) {
                meter.pitch.store(hz.to_bits(), Ordering::Relaxed);
            }
        }

        let saved_to = take.and_then(|t| match t.writer.finalize() {
            Ok(()) => Some(t.path),
            Err(e) => {
                warn!(path = %t.path.display(), "Failed to finalize WAV file: {e}");
                None
            }
        });

        info!(
            observations = session.observation_count(),
            "frame delivery stopped, resolving range"
        );
        SessionSummary {
            saved_to,
            ..session.finish()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::range::VocalRange;
    use crate::audio::frames::FrameAssembler;
    use std::f32::consts::PI;
    use std::sync::mpsc;

    fn sine_wave(freq_hz: f32, sample_rate: u32, duration_secs: f32) -> Vec<f32> {
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.5 * (2.0 * PI * freq_hz * t).sin()
            })
            .collect()
    }

    fn frames_of(samples: &[f32], sample_rate: u32, frame_size: usize) -> Vec<AudioFrame> {
        let mut assembler = FrameAssembler::new(frame_size);
        let mut frames = Vec::new();
        assembler.push(samples, |s| frames.push(AudioFrame { samples: s, sample_rate }));
        if let Some(tail) = assembler.flush() {
            frames.push(AudioFrame {
                samples: tail,
                sample_rate,
            });
        }
        frames
    }

    /// Reports a fixed pitch for every frame it is asked about.
    struct Constant(f32);

    impl PitchEstimator for Constant {
        fn estimate(&mut self, _frame: &[f32], _sample_rate: u32) -> Option<f32> {
            Some(self.0)
        }
    }

    #[test]
    fn sustained_a3_resolves_to_a3() {
        let samples = sine_wave(220.0, 44100, 1.5);
        let summary = analyze_samples(&samples, 44100, &SessionSettings::default(), |_| {});

        let est = summary.estimate.expect("long enough to resolve");
        let (low, high) = est.range.notes().expect("a clean tone has a range");
        assert_eq!(low.to_string(), "A3");
        assert_eq!(high.to_string(), "A3");
        assert!(summary.stats.kept > 0);
    }

    #[test]
    fn silence_gives_sentinel_range() {
        let samples = vec![0.0; 44100];
        let summary = analyze_samples(&samples, 44100, &SessionSettings::default(), |_| {});

        let est = summary.estimate.unwrap();
        assert_eq!(est.range, VocalRange::NotAvailable);
        assert!(!est.health_message().is_empty());
        assert_eq!(summary.stats.gated, summary.stats.frames);
    }

    #[test]
    fn short_session_is_not_resolved() {
        let samples = sine_wave(220.0, 44100, 0.5);
        let summary = analyze_samples(&samples, 44100, &SessionSettings::default(), |_| {});
        assert!(summary.estimate.is_none());
        assert!(summary.duration < Duration::from_millis(800));
    }

    #[test]
    fn progress_reaches_the_end() {
        let samples = vec![0.0; 10_000];
        let mut last = 0;
        analyze_samples(&samples, 44100, &SessionSettings::default(), |n| last = n);
        assert_eq!(last, 10_000);
    }

    #[test]
    fn duration_counts_samples() {
        let mut session = Session::with_estimator(
            SessionSettings::default(),
            1000,
            Box::new(Constant(220.0)),
        );
        session.process(&[0.1; 500]);
        session.process(&[0.1; 500]);
        assert_eq!(session.duration(), Duration::from_secs(1));
        assert_eq!(session.observation_count(), 2);
    }

    #[test]
    fn consumer_drains_queued_frames_before_resolving() {
        let (tx, rx) = mpsc::sync_channel::<AudioFrame>(4);
        let meter = Arc::new(LiveMeter::default());
        let handle = spawn_consumer(rx, SessionSettings::default(), 44100, Arc::clone(&meter), None);

        let samples = sine_wave(440.0, 44100, 1.2);
        for frame in frames_of(&samples, 44100, 2048) {
            tx.send(frame).unwrap();
        }
        drop(tx);

        let summary = handle.join().unwrap();
        assert!(summary.saved_to.is_none());
        assert_eq!(summary.stats.frames, samples.len().div_ceil(2048));
        let (_, high) = summary.estimate.unwrap().range.notes().unwrap();
        assert_eq!(high.to_string(), "A4");
        assert!(meter.pitch_hz().is_some());
    }

    #[test]
    fn consumer_writes_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let (tx, rx) = mpsc::sync_channel::<AudioFrame>(2);
        let handle = spawn_consumer(
            rx,
            SessionSettings::default(),
            16000,
            Arc::new(LiveMeter::default()),
            Some(TakeWriter::create(path.clone(), 16000).unwrap()),
        );

        for frame in frames_of(&vec![0.25; 5000], 16000, 2048) {
            tx.send(frame).unwrap();
        }
        drop(tx);
        let summary = handle.join().unwrap();
        assert_eq!(summary.saved_to.as_deref(), Some(path.as_path()));

        let (loaded, spec) = wav::load_samples(&path).unwrap();
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(loaded.len(), 5000);
    }

    #[test]
    fn take_in_unwritable_location_fails_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = TakeWriter::create(blocker.join("take.wav"), 44100);
        assert!(result.is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_save_keeps_the_range() {
        // Every flush to /dev/full fails with ENOSPC.
        let Ok(take) = TakeWriter::create(PathBuf::from("/dev/full"), 44100) else {
            return;
        };
        let (tx, rx) = mpsc::sync_channel::<AudioFrame>(4);
        let handle = spawn_consumer(
            rx,
            SessionSettings::default(),
            44100,
            Arc::new(LiveMeter::default()),
            Some(take),
        );

        let samples = sine_wave(440.0, 44100, 1.2);
        for frame in frames_of(&samples, 44100, 2048) {
            tx.send(frame).unwrap();
        }
        drop(tx);

        let summary = handle.join().unwrap();
        assert!(summary.saved_to.is_none());
        assert_eq!(summary.stats.frames, samples.len().div_ceil(2048));
        let (_, high) = summary.estimate.unwrap().range.notes().unwrap();
        assert_eq!(high.to_string(), "A4");
    }
}
