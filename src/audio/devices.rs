use anyhow::{Context, Result};
use console::style;
use cpal::traits::{DeviceTrait, HostTrait};

/// An input device and the formats it advertises.
pub struct InputDevice {
    pub name: String,
    pub is_default: bool,
    /// e.g. "1ch  44100-48000 Hz  F32"
    pub configs: Vec<String>,
}

/// Enumerate input devices on the default host.
pub fn input_devices() -> Result<Vec<InputDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let devices = host
        .input_devices()
        .context("Failed to enumerate input devices")?
        .map(|device| {
            let name = device.name().unwrap_or_else(|_| "<unknown>".into());
            let configs = match device.supported_input_configs() {
                Ok(configs) => configs
                    .map(|cfg| {
                        describe_config(
                            cfg.channels(),
                            cfg.min_sample_rate().0,
                            cfg.max_sample_rate().0,
                            &format!("{:?}", cfg.sample_format()),
                        )
                    })
                    .collect(),
                Err(e) => vec![format!("Could not query configs: {e}")],
            };
            InputDevice {
                is_default: name == default_name,
                name,
                configs,
            }
        })
        .collect();

    Ok(devices)
}

fn describe_config(channels: u16, min_rate: u32, max_rate: u32, format: &str) -> String {
    if min_rate == max_rate {
        format!("{channels}ch  {min_rate} Hz  {format}")
    } else {
        format!("{channels}ch  {min_rate}-{max_rate} Hz  {format}")
    }
}

/// Print the available input devices; the default is starred.
pub fn list_devices() -> Result<()> {
    let devices = input_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found.");
        return Ok(());
    }

    println!("{}", style("Audio Input Devices").bold());
    println!();

    for device in &devices {
        if device.is_default {
            println!("  {} {}", style("*").green().bold(), style(&device.name).green().bold());
        } else {
            println!("    {}", style(&device.name).bold());
        }
        for cfg in &device.configs {
            println!("      {cfg}");
        }
        println!();
    }

    if devices.iter().any(|d| d.is_default) {
        println!("  {} = default device", style("*").green().bold());
    }
    println!(
        "  Use {} or set {} in config.toml.",
        style("lyra record --device <NAME>").cyan(),
        style("recording.device").cyan()
    );

    Ok(())
}
