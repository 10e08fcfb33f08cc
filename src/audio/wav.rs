use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

pub type FileWriter = WavWriter<BufWriter<File>>;

/// Standard WAV spec for saved takes: mono 16-bit PCM.
pub fn recording_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Create a WavWriter at the given path, creating parent directories as needed.
pub fn create_writer(path: &Path, spec: WavSpec) -> Result<FileWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))
}

/// Write f32 samples in [-1.0, 1.0] as clamped 16-bit integers.
pub fn write_samples(writer: &mut FileWriter, samples: &[f32]) -> Result<()> {
    for &sample in samples {
        let s16 = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s16).context("Failed to write WAV sample")?;
    }
    Ok(())
}

/// Load a WAV file as mono f32 in [-1.0, 1.0].
///
/// Multi-channel files keep only the first channel. Returns (samples, spec)
/// so callers can read the sample rate.
pub fn load_samples(path: &Path) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<hound::Result<Vec<_>>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<hound::Result<Vec<_>>>()
            .context("Failed to read WAV samples")?,
    };

    let samples = super::frames::downmix_first_channel(&interleaved, channels);
    Ok((samples, spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("take.wav");

        let original: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0) * 2.0 - 1.0).collect();
        {
            let mut writer = create_writer(&path, recording_spec(44100)).unwrap();
            write_samples(&mut writer, &original).unwrap();
            writer.finalize().unwrap();
        }

        let (loaded, spec) = load_samples(&path).unwrap();
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.channels, 1);
        assert_eq!(loaded.len(), original.len());

        // 16-bit quantization
        for (orig, loaded) in original.iter().zip(loaded.iter()) {
            assert!(
                (orig - loaded).abs() < 0.001,
                "Sample mismatch: original={orig}, loaded={loaded}"
            );
        }
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        {
            let mut writer = create_writer(&path, recording_spec(8000)).unwrap();
            write_samples(&mut writer, &[2.0, -2.0]).unwrap();
            writer.finalize().unwrap();
        }
        let (loaded, _) = load_samples(&path).unwrap();
        assert!((loaded[0] - 1.0).abs() < 0.001);
        assert!((loaded[1] + 1.0).abs() < 0.001);
    }

    #[test]
    fn stereo_float_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        {
            let mut writer = WavWriter::create(&path, spec).unwrap();
            for (l, r) in [(0.1_f32, -0.5_f32), (0.2, -0.5), (0.3, -0.5)] {
                writer.write_sample(l).unwrap();
                writer.write_sample(r).unwrap();
            }
            writer.finalize().unwrap();
        }

        let (loaded, spec) = load_samples(&path).unwrap();
        assert_eq!(spec.channels, 2);
        assert_eq!(loaded, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn load_nonexistent_file() {
        let result = load_samples(Path::new("/tmp/does-not-exist-lyra.wav"));
        assert!(result.is_err());
    }
}
