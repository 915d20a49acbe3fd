//! Device selection by type or index
//!
//! Selection state is two optional indices; `None` means "host default".
//! All functions here work on a snapshot of the device table and never touch
//! the audio subsystem themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::device::DeviceInfo;
use crate::error::{Result, TesterError};

/// Stream direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Device family used by `use usb|line` and the startup flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Usb,
    Line,
}

impl DeviceKind {
    pub fn matches(self, device: &DeviceInfo) -> bool {
        match self {
            DeviceKind::Usb => device.is_usb(),
            DeviceKind::Line => !device.is_usb(),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Usb => write!(f, "usb"),
            DeviceKind::Line => write!(f, "line"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = TesterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "usb" => Ok(DeviceKind::Usb),
            "line" => Ok(DeviceKind::Line),
            other => Err(TesterError::invalid(format!(
                "unknown device type '{}', expected usb or line",
                other
            ))),
        }
    }
}

/// Case-insensitive "usb" substring test
pub fn is_usb_name(name: &str) -> bool {
    name.to_lowercase().contains("usb")
}

/// Currently selected devices; `None` uses the host default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub output: Option<usize>,
    pub input: Option<usize>,
}

/// Result of a successful `use usb|line`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSelection {
    pub kind: DeviceKind,
    pub output: Option<DeviceInfo>,
    pub input: Option<DeviceInfo>,
}

impl TypeSelection {
    /// One report line per direction, output first
    pub fn messages(&self) -> Vec<String> {
        [(Direction::Output, &self.output), (Direction::Input, &self.input)]
            .into_iter()
            .map(|(direction, chosen)| match chosen {
                Some(device) => format!(
                    "{} device set to: {} (#{})",
                    capitalized(direction),
                    device.name,
                    device.index
                ),
                None => format!("No {} {} device found.", self.kind, direction),
            })
            .collect()
    }
}

/// "Output" / "Input"
pub fn capitalized(direction: Direction) -> &'static str {
    match direction {
        Direction::Output => "Output",
        Direction::Input => "Input",
    }
}

/// First output-capable and first input-capable device of `kind`, scanned
/// independently in enumeration order
pub fn find_by_type(devices: &[DeviceInfo], kind: DeviceKind) -> (Option<&DeviceInfo>, Option<&DeviceInfo>) {
    let mut output = None;
    let mut input = None;
    for device in devices.iter().filter(|d| kind.matches(d)) {
        if output.is_none() && device.supports(Direction::Output) {
            output = Some(device);
        }
        if input.is_none() && device.supports(Direction::Input) {
            input = Some(device);
        }
    }
    (output, input)
}

/// Look up a device by index
pub fn find_device(devices: &[DeviceInfo], index: usize) -> Result<&DeviceInfo> {
    devices
        .iter()
        .find(|d| d.index == index)
        .ok_or(TesterError::NoSuchDevice(index))
}

impl Selection {
    pub fn get(&self, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Input => self.input,
            Direction::Output => self.output,
        }
    }

    fn slot(&mut self, direction: Direction) -> &mut Option<usize> {
        match direction {
            Direction::Input => &mut self.input,
            Direction::Output => &mut self.output,
        }
    }

    /// Select the first matching device per direction.
    ///
    /// A direction with no match keeps its previous selection and adds a
    /// warning. If neither direction matches nothing changes and
    /// `NoDevicesOfKind` is returned.
    pub fn select_by_type(&mut self, devices: &[DeviceInfo], kind: DeviceKind) -> Result<TypeSelection> {
        let (output, input) = find_by_type(devices, kind);
        if output.is_none() && input.is_none() {
            return Err(TesterError::NoDevicesOfKind(kind));
        }

        if let Some(device) = output {
            self.output = Some(device.index);
        }
        if let Some(device) = input {
            self.input = Some(device.index);
        }

        log::info!(
            "Selected {} devices: output={:?}, input={:?}",
            kind,
            self.output,
            self.input
        );

        Ok(TypeSelection {
            kind,
            output: output.cloned(),
            input: input.cloned(),
        })
    }

    /// Select a device by index for one direction.
    /// On error the selection is left untouched.
    pub fn set_device<'a>(
        &mut self,
        devices: &'a [DeviceInfo],
        direction: Direction,
        index: usize,
    ) -> Result<&'a DeviceInfo> {
        let device = find_device(devices, index)?;
        if !device.supports(direction) {
            return Err(TesterError::MissingChannels {
                index,
                name: device.name.clone(),
                direction,
            });
        }
        *self.slot(direction) = Some(index);
        log::info!("{} device set to #{} ({})", direction, index, device.name);
        Ok(device)
    }

    /// Device an operation should use: the selection, else the host default
    pub fn resolve<'a>(&self, devices: &'a [DeviceInfo], direction: Direction) -> Result<&'a DeviceInfo> {
        match self.get(direction) {
            Some(index) => find_device(devices, index),
            None => devices
                .iter()
                .find(|d| d.is_default(direction))
                .ok_or(TesterError::NoDefaultDevice(direction)),
        }
    }
}
