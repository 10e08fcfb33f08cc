use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::aggregator::BandConfig;
use crate::analysis::range::RangeConfig;
use crate::audio::session::SessionSettings;
use crate::dsp::gate::{GateConfig, DEFAULT_ENERGY_THRESHOLD};
use crate::dsp::pitch::{EstimatorKind, PitchConfig};
use crate::paths;

/// Application configuration, loaded from <config_dir>/config.toml.
///
/// Every struct is `#[serde(default)]`, so the file is optional and any
/// field left out falls back to the Default impl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recording: RecordingConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Input device name, or "default".
    pub device: String,
    /// Samples per analysis frame.
    pub frame_size: usize,
    /// Frames the capture callback may queue ahead of the analysis thread.
    pub queue_frames: usize,
    /// Also keep each live take as a WAV under the data directory.
    pub save_recordings: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Linear RMS below which a frame is skipped.
    pub energy_threshold: f32,
    /// Pitches at or below this are dropped (Hz).
    pub min_hz: f32,
    /// Pitches at or above this are dropped (Hz).
    pub max_hz: f32,
    pub low_percentile: f64,
    pub high_percentile: f64,
    /// Sessions shorter than this are not analyzed.
    pub min_session_ms: u64,
    pub estimator: EstimatorKind,
    pub power_threshold: f64,
    pub clarity_threshold: f64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            device: "default".into(),
            frame_size: 2048,
            queue_frames: 64,
            save_recordings: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let band = BandConfig::default();
        let range = RangeConfig::default();
        let pitch = PitchConfig::default();
        Self {
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
            min_hz: band.min_hz,
            max_hz: band.max_hz,
            low_percentile: range.low_percentile,
            high_percentile: range.high_percentile,
            min_session_ms: 800,
            estimator: pitch.estimator,
            power_threshold: pitch.power_threshold,
            clarity_threshold: pitch.clarity_threshold,
        }
    }
}

impl From<&AnalysisConfig> for GateConfig {
    fn from(cfg: &AnalysisConfig) -> Self {
        GateConfig {
            energy_threshold: cfg.energy_threshold,
        }
    }
}

impl From<&AnalysisConfig> for BandConfig {
    fn from(cfg: &AnalysisConfig) -> Self {
        BandConfig {
            min_hz: cfg.min_hz,
            max_hz: cfg.max_hz,
        }
    }
}

impl From<&AnalysisConfig> for RangeConfig {
    fn from(cfg: &AnalysisConfig) -> Self {
        RangeConfig {
            low_percentile: cfg.low_percentile,
            high_percentile: cfg.high_percentile,
        }
    }
}

impl From<&AnalysisConfig> for PitchConfig {
    fn from(cfg: &AnalysisConfig) -> Self {
        PitchConfig {
            estimator: cfg.estimator,
            power_threshold: cfg.power_threshold,
            clarity_threshold: cfg.clarity_threshold,
        }
    }
}

impl From<&AppConfig> for SessionSettings {
    fn from(cfg: &AppConfig) -> Self {
        SessionSettings {
            frame_size: cfg.recording.frame_size.max(1),
            gate: (&cfg.analysis).into(),
            band: (&cfg.analysis).into(),
            pitch: (&cfg.analysis).into(),
            range: (&cfg.analysis).into(),
            min_duration: Duration::from_millis(cfg.analysis.min_session_ms),
        }
    }
}

impl AppConfig {
    /// Reject values that would break the analysis: inverted percentiles,
    /// an empty band, a NaN or negative gate.
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;

        if !(a.energy_threshold.is_finite() && a.energy_threshold >= 0.0) {
            bail!(
                "analysis.energy_threshold must be a finite number >= 0, got {}",
                a.energy_threshold
            );
        }
        if !(a.min_hz.is_finite() && a.max_hz.is_finite() && a.min_hz < a.max_hz) {
            bail!(
                "analysis.min_hz must be below analysis.max_hz, got {} and {}",
                a.min_hz,
                a.max_hz
            );
        }
        if !(0.0 <= a.low_percentile
            && a.low_percentile <= a.high_percentile
            && a.high_percentile <= 1.0)
        {
            bail!(
                "percentiles must satisfy 0 <= low_percentile <= high_percentile <= 1, got {} and {}",
                a.low_percentile,
                a.high_percentile
            );
        }
        if self.recording.frame_size == 0 {
            bail!("recording.frame_size must be at least 1");
        }
        Ok(())
    }
}

/// Load the config from the standard location; defaults if it is missing.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&paths::config_file())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.analysis.energy_threshold, 0.005);
        assert_eq!(cfg.analysis.min_hz, 65.0);
        assert_eq!(cfg.analysis.max_hz, 1200.0);
        assert_eq!(cfg.recording.frame_size, 2048);
        assert_eq!(cfg.analysis.estimator, EstimatorKind::Mcleod);
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[analysis]
energy_threshold = 0.02
estimator = "autocorrelation"
"#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.analysis.energy_threshold, 0.02);
        assert_eq!(cfg.analysis.estimator, EstimatorKind::Autocorrelation);
        // Unspecified fields should be defaults
        assert_eq!(cfg.analysis.high_percentile, 0.9);
        assert_eq!(cfg.recording.device, "default");
    }

    #[test]
    fn session_settings_bridge() {
        let mut cfg = AppConfig::default();
        cfg.analysis.min_session_ms = 1500;
        cfg.analysis.max_hz = 1000.0;
        cfg.recording.frame_size = 1024;

        let settings: SessionSettings = (&cfg).into();
        assert_eq!(settings.frame_size, 1024);
        assert_eq!(settings.min_duration, Duration::from_millis(1500));
        assert_eq!(settings.band.max_hz, 1000.0);
        assert_eq!(settings.gate.energy_threshold, 0.005);
        assert_eq!(settings.range.low_percentile, 0.1);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(cfg.recording.queue_frames, 64);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[analysis\nmin_hz = ").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    fn load_str(toml_str: &str) -> Result<AppConfig> {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, toml_str).unwrap();
        load_config_from(&path)
    }

    #[test]
    fn defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_percentiles_are_rejected() {
        let err = load_str("[analysis]\nlow_percentile = 0.9\nhigh_percentile = 0.1\n")
            .unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
        assert!(format!("{err:#}").contains("low_percentile <= high_percentile"));
    }

    #[test]
    fn out_of_unit_percentile_is_rejected() {
        assert!(load_str("[analysis]\nhigh_percentile = 1.5\n").is_err());
        assert!(load_str("[analysis]\nlow_percentile = -0.1\n").is_err());
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let err = load_str("[analysis]\nenergy_threshold = nan\n").unwrap_err();
        assert!(format!("{err:#}").contains("energy_threshold"));
        assert!(load_str("[analysis]\nenergy_threshold = -0.01\n").is_err());
    }

    #[test]
    fn empty_band_is_rejected() {
        let err = load_str("[analysis]\nmin_hz = 1200.0\nmax_hz = 65.0\n").unwrap_err();
        assert!(format!("{err:#}").contains("min_hz"));
    }

    #[test]
    fn equal_percentiles_are_allowed() {
        let cfg = load_str("[analysis]\nlow_percentile = 0.5\nhigh_percentile = 0.5\n").unwrap();
        assert_eq!(cfg.analysis.low_percentile, 0.5);
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let loaded: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(loaded.analysis.min_hz, cfg.analysis.min_hz);
        assert_eq!(loaded.analysis.estimator, cfg.analysis.estimator);
    }
}
