//! Interactive session state and command execution
//!
//! A [`Session`] owns the audio host, the current device selection and the
//! settings. It is created once at startup and every command runs through
//! it; operations read the selection once when they start.

use std::io::Write;

use crate::audio::device::DeviceInfo;
use crate::audio::host::{AudioHost, Completion, LoopbackRequest, MeterRequest};
use crate::audio::loopback::block_latency_ms;
use crate::audio::meter::format_reading;
use crate::audio::mixer::loopback_channels;
use crate::audio::selector::{capitalized, DeviceKind, Direction, Selection};
use crate::audio::signals::{
    generate_panned_tone, generate_stereo_tone, generate_sweep, Channel, SampleBuffer,
};
use crate::cancel::CancelToken;
use crate::commands::devices::format_device_table;
use crate::commands::help::HELP;
use crate::commands::Command;
use crate::config::TesterConfig;
use crate::error::{Result, TesterError};

/// Whether the command loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session<H: AudioHost> {
    host: H,
    selection: Selection,
    config: TesterConfig,
    cancel: CancelToken,
}

impl<H: AudioHost> Session<H> {
    pub fn new(host: H, config: TesterConfig, cancel: CancelToken) -> Self {
        Self {
            host,
            selection: Selection::default(),
            config,
            cancel,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run one parsed command.
    ///
    /// The cancel token stays armed for the whole command, so an interrupt
    /// while devices are being enumerated stops the command instead of the
    /// session.
    pub fn execute(&mut self, command: Command, out: &mut dyn Write) -> Result<Flow> {
        let cancel = self.cancel.clone();
        let _armed = cancel.arm();
        match command {
            Command::Devices => self.list_devices(out)?,
            Command::Tone { frequency, seconds } => self.play_tone(frequency, seconds, out)?,
            Command::ChannelTest(channel) => self.play_channel_test(channel, out)?,
            Command::Sweep { seconds } => self.play_sweep(seconds, out)?,
            Command::Mic => self.mic_level_meter(out)?,
            Command::Loopback => self.mic_loopback(out)?,
            Command::SetDevice { direction, index } => self.set_device(direction, index, out)?,
            Command::Use(kind) => self.select_by_type(kind, out)?,
            Command::Help => write!(out, "{}", HELP)?,
            Command::Usage(usage) => writeln!(out, "  Usage: {}", usage)?,
            Command::Unknown(cmd) => {
                writeln!(out, "  Unknown command: {}. Type 'help' for commands.", cmd)?
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    pub fn list_devices(&self, out: &mut dyn Write) -> Result<()> {
        let devices = self.host.devices()?;
        write!(out, "{}", format_device_table(&devices, &self.selection))?;
        Ok(())
    }

    /// Output device for this operation plus its default sample rate
    fn output_target(&self) -> Result<DeviceInfo> {
        let devices = self.host.devices()?;
        Ok(self.selection.resolve(&devices, Direction::Output)?.clone())
    }

    /// Report an interrupt that arrived before any stream was opened
    fn stopped_early(&self, out: &mut dyn Write) -> Result<bool> {
        if self.cancel.is_cancelled() {
            writeln!(out, "\n  Stopped.")?;
            return Ok(true);
        }
        Ok(false)
    }

    fn play(&self, device: &DeviceInfo, buffer: &SampleBuffer, out: &mut dyn Write) -> Result<()> {
        if self.stopped_early(out)? {
            return Ok(());
        }
        let outcome = self
            .host
            .play(device.index, buffer, device.default_sample_rate, &self.cancel)?;
        match outcome {
            Completion::Finished => writeln!(out, "  Done.")?,
            Completion::Interrupted => writeln!(out, "\n  Stopped.")?,
        }
        Ok(())
    }

    fn play_tone(&self, frequency: f64, seconds: f64, out: &mut dyn Write) -> Result<()> {
        let device = self.output_target()?;
        let buffer = generate_stereo_tone(frequency, seconds, device.default_sample_rate)?;
        writeln!(out, "  Playing {}Hz tone for {}s...", frequency, seconds)?;
        out.flush()?;
        self.play(&device, &buffer, out)
    }

    fn play_channel_test(&self, channel: Channel, out: &mut dyn Write) -> Result<()> {
        let frequency = self.config.channel_test_frequency;
        let seconds = self.config.channel_test_seconds;
        let device = self.output_target()?;
        let buffer = generate_panned_tone(frequency, seconds, device.default_sample_rate, channel)?;
        writeln!(
            out,
            "  Playing {}Hz in {} channel for {}s...",
            frequency, channel, seconds
        )?;
        out.flush()?;
        self.play(&device, &buffer, out)
    }

    fn play_sweep(&self, seconds: f64, out: &mut dyn Write) -> Result<()> {
        let device = self.output_target()?;
        let buffer = generate_sweep(seconds, device.default_sample_rate)?;
        writeln!(out, "  Sweeping 20Hz → 20kHz over {}s...", seconds)?;
        out.flush()?;
        self.play(&device, &buffer, out)
    }

    fn mic_level_meter(&self, out: &mut dyn Write) -> Result<()> {
        let devices = self.host.devices()?;
        let device = self.selection.resolve(&devices, Direction::Input)?;
        if !device.supports(Direction::Input) {
            return Err(TesterError::MissingChannels {
                index: device.index,
                name: device.name.clone(),
                direction: Direction::Input,
            });
        }

        let request = MeterRequest {
            device: device.index,
            sample_rate: device.default_sample_rate,
            block_size: self.config.meter_block_size,
        };
        let bar_width = self.config.bar_width;

        writeln!(out, "  Mic level meter (Ctrl+C to stop)\n")?;
        out.flush()?;

        if self.stopped_early(out)? {
            return Ok(());
        }
        let mut write_error = None;
        let outcome = self.host.monitor(request, &self.cancel, &mut |db| {
            if write_error.is_some() {
                return;
            }
            let line = format_reading(db, bar_width);
            if let Err(e) = write!(out, "\r  {}", line).and_then(|_| out.flush()) {
                write_error = Some(e);
            }
        });
        if let Some(e) = write_error {
            return Err(e.into());
        }

        match outcome? {
            Completion::Finished | Completion::Interrupted => writeln!(out, "\n  Stopped.")?,
        }
        Ok(())
    }

    fn mic_loopback(&self, out: &mut dyn Write) -> Result<()> {
        let devices = self.host.devices()?;
        let input = self.selection.resolve(&devices, Direction::Input)?;
        let output = self.selection.resolve(&devices, Direction::Output)?;

        let (input_channels, output_channels) =
            loopback_channels(input.max_input_channels, output.max_output_channels);
        for (device, direction, channels) in [
            (input, Direction::Input, input_channels),
            (output, Direction::Output, output_channels),
        ] {
            if channels == 0 {
                return Err(TesterError::MissingChannels {
                    index: device.index,
                    name: device.name.clone(),
                    direction,
                });
            }
        }

        let request = LoopbackRequest {
            input_device: input.index,
            output_device: output.index,
            input_channels,
            output_channels,
            sample_rate: output.default_sample_rate,
            block_size: self.config.loopback_block_size,
        };

        writeln!(
            out,
            "  Loopback: mic → headphones (latency ~{:.0}ms, Ctrl+C to stop)",
            block_latency_ms(request.block_size, request.sample_rate)
        )?;
        out.flush()?;

        if self.stopped_early(out)? {
            return Ok(());
        }
        match self.host.loopback(request, &self.cancel)? {
            Completion::Finished | Completion::Interrupted => writeln!(out, "\n  Stopped.")?,
        }
        Ok(())
    }

    pub fn set_device(&mut self, direction: Direction, index: usize, out: &mut dyn Write) -> Result<()> {
        let devices = self.host.devices()?;
        let device = self.selection.set_device(&devices, direction, index)?;
        writeln!(
            out,
            "  {} device set to: {} (#{})",
            capitalized(direction),
            device.name,
            index
        )?;
        Ok(())
    }

    pub fn select_by_type(&mut self, kind: DeviceKind, out: &mut dyn Write) -> Result<()> {
        let devices = self.host.devices()?;
        let chosen = match self.selection.select_by_type(&devices, kind) {
            Ok(chosen) => chosen,
            Err(TesterError::NoDevicesOfKind(kind)) => {
                writeln!(out, "  No {} devices found.", kind)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for line in chosen.messages() {
            writeln!(out, "  {}", line)?;
        }
        Ok(())
    }
}
