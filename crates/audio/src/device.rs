use anyhow::{Context, anyhow};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn host() -> cpal::Host {
    cpal::default_host()
}

/// Resolves an input device by name, or the host default when none is
/// given.
pub fn get_or_default_input(name: Option<&str>) -> anyhow::Result<Device> {
    let host = host();
    match name {
        Some(target) => host
            .input_devices()
            .context("failed to enumerate input devices")?
            .find(|d| d.name().is_ok_and(|n| n == target))
            .ok_or_else(|| anyhow!("no input device named {target:?}")),
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("no default input device")),
    }
}

/// Resolves an output device by name, or the host default when none is
/// given.
pub fn get_or_default_output(name: Option<&str>) -> anyhow::Result<Device> {
    let host = host();
    match name {
        Some(target) => host
            .output_devices()
            .context("failed to enumerate output devices")?
            .find(|d| d.name().is_ok_and(|n| n == target))
            .ok_or_else(|| anyhow!("no output device named {target:?}")),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device")),
    }
}

/// One line per input device, with channel count, sample rate and a
/// `[default]` marker.
pub fn describe_inputs() -> anyhow::Result<String> {
    let host = host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let mut lines = Vec::new();
    for device in host
        .input_devices()
        .context("failed to enumerate input devices")?
    {
        let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        let Ok(config) = device.default_input_config() else {
            continue;
        };
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_name.as_ref() {
            line.push_str(" [default]");
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// One line per output device, same format as `describe_inputs`.
pub fn describe_outputs() -> anyhow::Result<String> {
    let host = host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());
    let mut lines = Vec::new();
    for device in host
        .output_devices()
        .context("failed to enumerate output devices")?
    {
        let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        let Ok(config) = device.default_output_config() else {
            continue;
        };
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_name.as_ref() {
            line.push_str(" [default]");
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}
