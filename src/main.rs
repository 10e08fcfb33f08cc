mod analysis;
mod audio;
mod cli;
mod config;
mod dsp;
mod music;
mod paths;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use audio::recorder::RecordOptions;
use audio::session::SessionSettings;
use cli::{AnalysisArgs, Cli, Command};
use config::AppConfig;
use music::lookup::{self, NoteQuery};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Devices => audio::devices::list_devices(),

        Command::Record {
            device,
            analysis: args,
            save,
        } => {
            let mut config = config::load_config()?;
            if let Some(device) = device {
                config.recording.device = device;
            }
            apply_overrides(&mut config, &args);
            config.validate().context("Invalid command-line option")?;

            let save_to = save.or_else(|| {
                config
                    .recording
                    .save_recordings
                    .then(|| paths::next_take_path(&chrono::Local::now().date_naive()))
            });
            let opts = RecordOptions {
                device: config.recording.device.clone(),
                queue_frames: config.recording.queue_frames,
                save_to,
            };

            let settings: SessionSettings = (&config).into();
            let summary = audio::recorder::record_session(&settings, &opts)?;
            report::print_summary(&summary, args.genre.as_deref(), args.json)
        }

        Command::Analyze {
            path,
            analysis: args,
            frame_size,
        } => {
            let mut config = config::load_config()?;
            if let Some(n) = frame_size {
                config.recording.frame_size = n;
            }
            apply_overrides(&mut config, &args);
            config.validate().context("Invalid command-line option")?;

            let settings: SessionSettings = (&config).into();
            let summary = analysis::analyzer::analyze_file(&path, &settings)?;
            report::print_summary(&summary, args.genre.as_deref(), args.json)
        }

        Command::Note { value } => {
            let query: NoteQuery = value
                .parse()
                .with_context(|| format!("Could not read {value:?} as a note"))?;
            match lookup::resolve(query) {
                Some(info) => lookup::print_note_info(&info),
                None => println!("{}", style("No note for that frequency.").yellow()),
            }
            Ok(())
        }

        Command::Paths => {
            println!("  {:12} {}", style("Config").bold(), paths::config_file().display());
            println!("  {:12} {}", style("Recordings").bold(), paths::recordings_dir().display());
            Ok(())
        }
    }
}

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut AppConfig, args: &AnalysisArgs) {
    if let Some(threshold) = args.threshold {
        config.analysis.energy_threshold = threshold;
    }
    if let Some(estimator) = args.estimator {
        config.analysis.estimator = estimator;
    }
}
