//! Audio device enumeration and stream configuration

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use super::selector::{is_usb_name, Direction};
use crate::error::{Result, TesterError};

/// Rate reported for devices whose default config cannot be queried
pub const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// One entry of the host's device table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Position in the host's enumeration order
    pub index: usize,
    pub name: String,
    pub max_input_channels: usize,
    pub max_output_channels: usize,
    pub default_sample_rate: u32,
    pub is_default_input: bool,
    pub is_default_output: bool,
}

impl DeviceInfo {
    pub fn channels(&self, direction: Direction) -> usize {
        match direction {
            Direction::Input => self.max_input_channels,
            Direction::Output => self.max_output_channels,
        }
    }

    pub fn supports(&self, direction: Direction) -> bool {
        self.channels(direction) > 0
    }

    pub fn is_usb(&self) -> bool {
        is_usb_name(&self.name)
    }

    pub fn is_default(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.is_default_input,
            Direction::Output => self.is_default_output,
        }
    }
}

fn max_channels<I>(configs: std::result::Result<I, cpal::SupportedStreamConfigsError>) -> usize
where
    I: Iterator<Item = cpal::SupportedStreamConfigRange>,
{
    configs
        .map(|ranges| ranges.map(|r| r.channels() as usize).max().unwrap_or(0))
        .unwrap_or(0)
}

fn default_rate(device: &cpal::Device) -> u32 {
    device
        .default_output_config()
        .or_else(|_| device.default_input_config())
        .map(|c| c.sample_rate().0)
        .unwrap_or(FALLBACK_SAMPLE_RATE)
}

/// Enumerate every device the host exposes, both directions
pub fn list_devices(host: &cpal::Host) -> Result<Vec<DeviceInfo>> {
    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    let devices = host
        .devices()
        .map_err(|e| TesterError::driver("Failed to enumerate devices", e))?;

    let mut result = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        result.push(DeviceInfo {
            index,
            max_input_channels: max_channels(device.supported_input_configs()),
            max_output_channels: max_channels(device.supported_output_configs()),
            default_sample_rate: default_rate(&device),
            is_default_input: Some(&name) == default_input.as_ref(),
            is_default_output: Some(&name) == default_output.as_ref(),
            name,
        });
    }

    log::debug!("Enumerated {} audio devices", result.len());
    Ok(result)
}

/// Reopen a device by its enumeration index
pub fn open_device(host: &cpal::Host, index: usize) -> Result<cpal::Device> {
    host.devices()
        .map_err(|e| TesterError::driver("Failed to enumerate devices", e))?
        .nth(index)
        .ok_or(TesterError::NoSuchDevice(index))
}

/// Pick a stream config for `direction`.
///
/// Prefers a supported range with exactly `channels` channels covering
/// `sample_rate`, with a fixed `block_size` when the range allows it. Falls
/// back to the device's default channel count at the requested rate.
pub fn negotiate_config(
    device: &cpal::Device,
    direction: Direction,
    channels: u16,
    sample_rate: u32,
    block_size: u32,
) -> Result<cpal::StreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> = match direction {
        Direction::Input => device
            .supported_input_configs()
            .map_err(|e| TesterError::driver("Failed to get supported input configs", e))?
            .collect(),
        Direction::Output => device
            .supported_output_configs()
            .map_err(|e| TesterError::driver("Failed to get supported output configs", e))?
            .collect(),
    };

    for range in &ranges {
        let min_rate = range.min_sample_rate().0;
        let max_rate = range.max_sample_rate().0;

        if range.channels() == channels && sample_rate >= min_rate && sample_rate <= max_rate {
            let buffer_size = match range.buffer_size() {
                cpal::SupportedBufferSize::Range { min, max }
                    if block_size >= *min && block_size <= *max =>
                {
                    cpal::BufferSize::Fixed(block_size)
                }
                _ => cpal::BufferSize::Default,
            };
            return Ok(cpal::StreamConfig {
                channels,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size,
            });
        }
    }

    let default_config = match direction {
        Direction::Input => device.default_input_config(),
        Direction::Output => device.default_output_config(),
    }
    .map_err(|e| TesterError::driver("Failed to get default config", e))?;

    log::warn!(
        "No {} config with {} channels at {} Hz, using {} channels",
        direction,
        channels,
        sample_rate,
        default_config.channels()
    );

    Ok(cpal::StreamConfig {
        channels: default_config.channels(),
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    })
}

/// Human-readable direction summary used by the device table
pub fn direction_label(info: &DeviceInfo) -> &'static str {
    match (info.supports(Direction::Input), info.supports(Direction::Output)) {
        (true, true) => "in/out",
        (true, false) => "input",
        (false, true) => "output",
        (false, false) => "",
    }
}
