use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::dsp::pitch::EstimatorKind;

#[derive(Parser)]
#[command(name = "lyra")]
#[command(about = "Find your vocal range by singing into the microphone")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List available audio input devices
    Devices,

    /// Record a live session and report the range
    Record {
        /// Input device name (default: from config)
        #[arg(long)]
        device: Option<String>,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Save the take to this WAV file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Analyze a recorded WAV file
    Analyze {
        /// Path to the WAV file
        path: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Samples per analysis frame
        #[arg(long)]
        frame_size: Option<usize>,
    },

    /// Convert between frequency, MIDI number and note name
    Note {
        /// 440, 440hz, m69 or A4
        value: String,
    },

    /// Show where data and config files are stored
    Paths,
}

/// Flags shared by `record` and `analyze`.
#[derive(clap::Args, Debug, Default)]
pub struct AnalysisArgs {
    /// Energy gate threshold (linear RMS)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Pitch estimator
    #[arg(long, value_enum)]
    pub estimator: Option<EstimatorKind>,

    /// Genre to use in the recommendation queries
    #[arg(long)]
    pub genre: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
