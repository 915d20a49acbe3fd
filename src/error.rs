//! Error taxonomy shared by the generator, selector and stream layers.

use thiserror::Error;

use crate::audio::selector::{DeviceKind, Direction};

/// Errors produced while handling a single command.
///
/// None of these are fatal to the interactive session; they are caught at the
/// command-dispatch boundary and printed.
#[derive(Debug, Error)]
pub enum TesterError {
    /// Malformed or out-of-range numeric argument.
    #[error("{0}")]
    InvalidParameter(String),

    /// Index does not resolve to an entry of the device table.
    #[error("device {0} not found")]
    NoSuchDevice(usize),

    /// Device exists but cannot be used in the requested direction.
    #[error("device {index} ({name}) has no {direction} channels")]
    MissingChannels {
        index: usize,
        name: String,
        direction: Direction,
    },

    /// `use usb|line` matched nothing in either direction.
    #[error("no {0} devices found")]
    NoDevicesOfKind(DeviceKind),

    /// Nothing selected and the host reports no default device.
    #[error("no default {0} device available")]
    NoDefaultDevice(Direction),

    /// Failure reported by the audio subsystem, kept verbatim.
    #[error("{0}")]
    Driver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TesterError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn driver(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Driver(format!("{}: {}", context, err))
    }

    /// True for failures that came from the audio subsystem itself.
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}

pub type Result<T> = std::result::Result<T, TesterError>;
