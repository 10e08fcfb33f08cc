use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;

/// Directory layout, resolved through the `dirs` crate:
///   Config:  $XDG_CONFIG_HOME/lyra  (~/.config/lyra)
///   Data:    $XDG_DATA_HOME/lyra    (~/.local/share/lyra)
/// On macOS both live under ~/Library/Application Support/lyra.

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lyra")
    })
}

pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lyra")
    })
}

/// <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// <data_dir>/recordings
pub fn recordings_dir() -> PathBuf {
    data_dir().join("recordings")
}

/// Next free take for a date: <recordings>/<date>/take_NNN.wav
pub fn next_take_path(date: &NaiveDate) -> PathBuf {
    next_take_in(&recordings_dir().join(date.to_string()))
}

/// Numbered takes in a directory, sorted ascending.
fn list_takes_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut takes: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "wav") && take_number(p).is_some())
        .collect();
    takes.sort();
    takes
}

fn take_number(path: &Path) -> Option<u32> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix("take_"))
        .and_then(|n| n.parse::<u32>().ok())
}

fn next_take_in(dir: &Path) -> PathBuf {
    let max_num = list_takes_in(dir)
        .iter()
        .filter_map(|p| take_number(p))
        .max()
        .unwrap_or(0);

    dir.join(format!("take_{:03}.wav", max_num + 1))
}
