//! Line-oriented command surface
//!
//! Each input line is parsed into a [`Command`] and run by the session.
//! Errors stop at this boundary: they are printed and the loop continues.

pub mod devices;
pub mod help;
pub mod logging;
pub mod repl;

use std::io::{self, Write};

use crate::audio::host::AudioHost;
use crate::audio::selector::{DeviceKind, Direction};
use crate::audio::signals::Channel;
use crate::config::TesterConfig;
use crate::error::{Result, TesterError};
use crate::session::{Flow, Session};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Devices,
    Tone { frequency: f64, seconds: f64 },
    ChannelTest(Channel),
    Sweep { seconds: f64 },
    Mic,
    Loopback,
    SetDevice { direction: Direction, index: usize },
    Use(DeviceKind),
    Help,
    Quit,
    /// Arguments missing or unrecognized; carries the usage line
    Usage(&'static str),
    Unknown(String),
}

fn parse_number(arg: Option<&&str>, default: f64, what: &str) -> Result<f64> {
    match arg {
        None => Ok(default),
        Some(text) => text
            .parse::<f64>()
            .map_err(|_| TesterError::invalid(format!("invalid {} '{}'", what, text))),
    }
}

fn parse_set_device(direction: Direction, args: &[&str], usage: &'static str) -> Result<Command> {
    match args.first() {
        None => Ok(Command::Usage(usage)),
        Some(text) => {
            let index = text
                .parse::<usize>()
                .map_err(|_| TesterError::invalid(format!("invalid device id '{}'", text)))?;
            Ok(Command::SetDevice { direction, index })
        }
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str, config: &TesterConfig) -> Result<Option<Command>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((head, args)) = parts.split_first() else {
        return Ok(None);
    };

    let command = match head.to_lowercase().as_str() {
        "devices" => Command::Devices,
        "tone" => Command::Tone {
            frequency: parse_number(args.first(), config.tone_frequency, "frequency")?,
            seconds: parse_number(args.get(1), config.tone_seconds, "duration")?,
        },
        "left" => Command::ChannelTest(Channel::Left),
        "right" => Command::ChannelTest(Channel::Right),
        "sweep" => Command::Sweep {
            seconds: parse_number(args.first(), config.sweep_seconds, "duration")?,
        },
        "mic" => Command::Mic,
        "loopback" => Command::Loopback,
        "output" => parse_set_device(Direction::Output, args, "output <device_id>")?,
        "input" => parse_set_device(Direction::Input, args, "input <device_id>")?,
        "use" => match args.first().map(|a| a.parse::<DeviceKind>()) {
            Some(Ok(kind)) => Command::Use(kind),
            _ => Command::Usage("use <line|usb>"),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    };
    Ok(Some(command))
}

/// Print an error the way the command loop reports it
pub fn report_error(err: &TesterError, out: &mut dyn Write) -> io::Result<()> {
    if err.is_driver() {
        writeln!(out, "  Audio error: {}", err)
    } else {
        writeln!(out, "  Error: {}", err)
    }
}

/// Parse and run one line, printing any error
pub fn dispatch_line<H: AudioHost>(session: &mut Session<H>, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
    let result = parse_command(line, session.config()).and_then(|command| match command {
        Some(command) => session.execute(command, out),
        None => Ok(Flow::Continue),
    });

    match result {
        Ok(flow) => Ok(flow),
        Err(err) => {
            log::debug!("Command '{}' failed: {:?}", line.trim(), err);
            report_error(&err, out)?;
            Ok(Flow::Continue)
        }
    }
}
