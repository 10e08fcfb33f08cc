use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use tracing::{info, warn};

use super::frames::{downmix_first_channel, AudioFrame, FrameAssembler};

/// Latest level and pitch, shared between the audio threads and the UI.
/// Values are f32 bit patterns; a stored 0 means "nothing yet".
#[derive(Debug, Default)]
pub struct LiveMeter {
    pub rms: AtomicU32,
    pub pitch: AtomicU32,
}

impl LiveMeter {
    /// Current input level in dBFS.
    pub fn rms_db(&self) -> f32 {
        let rms = f32::from_bits(self.rms.load(Ordering::Relaxed));
        if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            f32::NEG_INFINITY
        }
    }

    /// Most recent accepted pitch, if any.
    pub fn pitch_hz(&self) -> Option<f32> {
        let hz = f32::from_bits(self.pitch.load(Ordering::Relaxed));
        (hz > 0.0).then_some(hz)
    }
}

/// A running microphone capture. Dropping it stops the stream and closes
/// the frame channel.
pub struct Capture {
    stream: cpal::Stream,
    stop: Arc<AtomicBool>,
    pub device_name: String,
    pub sample_rate: u32,
    pub meter: Arc<LiveMeter>,
}

impl Capture {
    /// Stop delivering frames. The stream is dropped, which drops the
    /// sender held by the callback, so the consumer sees the channel close
    /// once it has drained what is queued.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        drop(self.stream);
        info!(device = %self.device_name, "capture stopped");
    }
}

/// Find an input device by name; "default" means the host default.
fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name.is_empty() || name == "default" {
        return host
            .default_input_device()
            .context("No default input device found");
    }

    host.input_devices()
        .context("Failed to enumerate input devices")?
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .with_context(|| format!("Input device not found: {name} (see `lyra devices`)"))
}

/// Start capturing from an input device.
///
/// Samples are downmixed to mono and re-chunked into frames of `frame_size`,
/// then sent over a bounded channel holding `queue_frames` frames. When the
/// consumer falls behind the callback blocks instead of dropping audio.
pub fn start_capture(
    device_name: &str,
    frame_size: usize,
    queue_frames: usize,
) -> Result<(Capture, Receiver<AudioFrame>)> {
    let host = cpal::default_host();
    let device = find_input_device(&host, device_name)?;
    let name = device.name().unwrap_or_else(|_| "<unknown>".into());

    let config = device
        .default_input_config()
        .context("Failed to get default input config")?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let format = config.sample_format();

    let (tx, rx) = mpsc::sync_channel::<AudioFrame>(queue_frames.max(1));
    let stop = Arc::new(AtomicBool::new(false));
    let meter = Arc::new(LiveMeter::default());

    let sink = FrameSink {
        tx,
        stop: Arc::clone(&stop),
        meter: Arc::clone(&meter),
        assembler: FrameAssembler::new(frame_size),
        channels,
        sample_rate,
    };

    let stream_config: cpal::StreamConfig = config.into();
    let stream = match format {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, sink)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, sink)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, sink)?,
        other => anyhow::bail!("Unsupported sample format: {other:?}"),
    };

    stream.play().context("Failed to start audio stream")?;
    info!(device = %name, sample_rate, channels, ?format, "capture started");

    Ok((
        Capture {
            stream,
            stop,
            device_name: name,
            sample_rate,
            meter,
        },
        rx,
    ))
}

/// State moved into the cpal data callback.
struct FrameSink {
    tx: SyncSender<AudioFrame>,
    stop: Arc<AtomicBool>,
    meter: Arc<LiveMeter>,
    assembler: FrameAssembler,
    channels: usize,
    sample_rate: u32,
}

impl FrameSink {
    fn accept(&mut self, mono: &[f32]) {
        if self.stop.load(Ordering::Relaxed) {
            return;
        }
        self.meter
            .rms
            .store(crate::dsp::gate::rms(mono).to_bits(), Ordering::Relaxed);

        let (tx, sample_rate) = (&self.tx, self.sample_rate);
        self.assembler.push(mono, |samples| {
            // Err only when the consumer is gone; nothing left to deliver to.
            let _ = tx.send(AudioFrame {
                samples,
                sample_rate,
            });
        });
    }
}

/// Deliver the trailing partial frame when the stream is torn down.
impl Drop for FrameSink {
    fn drop(&mut self) {
        if let Some(samples) = self.assembler.flush() {
            let _ = self.tx.send(AudioFrame {
                samples,
                sample_rate: self.sample_rate,
            });
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut sink: FrameSink,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let floats: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
            let mono = downmix_first_channel(&floats, sink.channels);
            sink.accept(&mono);
        },
        |err| warn!("Stream error: {err}"),
        None,
    )?;
    Ok(stream)
}
