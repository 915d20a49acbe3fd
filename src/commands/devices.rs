//! Device table rendering for the `devices` command

use std::fmt::Write;

use crate::audio::device::{direction_label, DeviceInfo};
use crate::audio::selector::Selection;

/// Markers shown after the device name: default input/output and USB
pub fn device_markers(device: &DeviceInfo) -> Vec<&'static str> {
    let mut markers = Vec::new();
    if device.is_default_input {
        markers.push("*IN");
    }
    if device.is_default_output {
        markers.push("*OUT");
    }
    if device.is_usb() {
        markers.push("USB");
    }
    markers
}

pub fn format_device_row(device: &DeviceInfo) -> String {
    let markers = device_markers(device);
    let marker_str = if markers.is_empty() {
        String::new()
    } else {
        format!(" [{}]", markers.join(", "))
    };
    format!(
        "  {:<3} {:<6}   {}/{}      {:>5}Hz  {}{}",
        device.index,
        direction_label(device),
        device.max_input_channels,
        device.max_output_channels,
        device.default_sample_rate,
        device.name,
        marker_str
    )
}

/// Full listing followed by the current selection
pub fn format_device_table(devices: &[DeviceInfo], selection: &Selection) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "\n  #  Type     Ch(I/O)  SampleRate  Name");
    let _ = writeln!(text, "  {}", "-".repeat(65));
    for device in devices {
        let _ = writeln!(text, "{}", format_device_row(device));
    }
    let _ = writeln!(text);
    if let Some(index) = selection.output {
        let _ = writeln!(text, "  Selected output: {}", index);
    }
    if let Some(index) = selection.input {
        let _ = writeln!(text, "  Selected input:  {}", index);
    }
    let _ = writeln!(text);
    text
}
