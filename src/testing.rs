//! In-memory audio host for tests

use std::cell::RefCell;

use crate::audio::device::DeviceInfo;
use crate::audio::host::{AudioHost, Completion, LoopbackRequest, MeterRequest};
use crate::audio::signals::SampleBuffer;
use crate::cancel::{CancelToken, Interrupt};
use crate::error::{Result, TesterError};

pub fn device(index: usize, name: &str, inputs: usize, outputs: usize, rate: u32) -> DeviceInfo {
    DeviceInfo {
        index,
        name: name.to_string(),
        max_input_channels: inputs,
        max_output_channels: outputs,
        default_sample_rate: rate,
        is_default_input: false,
        is_default_output: false,
    }
}

/// What a playback request looked like
#[derive(Debug, Clone, PartialEq)]
pub struct Played {
    pub device: usize,
    pub channels: usize,
    pub frames: usize,
    pub sample_rate: u32,
}

#[derive(Default)]
struct FakeState {
    devices: Vec<DeviceInfo>,
    played: Vec<Played>,
    meter_requests: Vec<MeterRequest>,
    loopback_requests: Vec<LoopbackRequest>,
    levels: Vec<f32>,
    interrupt_playback: bool,
    stream_error: Option<String>,
    enumeration_interrupt: Option<CancelToken>,
    enumeration_interrupts: Vec<Interrupt>,
}

/// Records requests instead of opening streams. Meter and loopback runs end
/// as if the user pressed Ctrl+C right away.
#[derive(Default)]
pub struct FakeHost {
    state: RefCell<FakeState>,
}

impl FakeHost {
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        let host = Self::default();
        host.set_devices(devices);
        host
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        self.state.borrow_mut().devices = devices;
    }

    pub fn played(&self) -> Vec<Played> {
        self.state.borrow().played.clone()
    }

    pub fn meter_requests(&self) -> Vec<MeterRequest> {
        self.state.borrow().meter_requests.clone()
    }

    pub fn loopback_requests(&self) -> Vec<LoopbackRequest> {
        self.state.borrow().loopback_requests.clone()
    }

    /// Readings delivered by the next meter run
    pub fn script_levels(&self, levels: Vec<f32>) {
        self.state.borrow_mut().levels = levels;
    }

    /// Make playback end as if interrupted
    pub fn interrupt_playback(&self) {
        self.state.borrow_mut().interrupt_playback = true;
    }

    /// Make every stream operation fail with a driver error
    pub fn fail_streams(&self, message: &str) {
        self.state.borrow_mut().stream_error = Some(message.to_string());
    }

    /// Send one Ctrl+C through `token` during the next device enumeration
    pub fn interrupt_during_enumeration(&self, token: CancelToken) {
        self.state.borrow_mut().enumeration_interrupt = Some(token);
    }

    /// What each enumeration-time interrupt did
    pub fn enumeration_interrupts(&self) -> Vec<Interrupt> {
        self.state.borrow().enumeration_interrupts.clone()
    }

    fn check_stream(&self, cancel: &CancelToken) -> Result<()> {
        assert!(cancel.is_armed(), "stream opened without an armed cancel token");
        match &self.state.borrow().stream_error {
            Some(message) => Err(TesterError::Driver(message.clone())),
            None => Ok(()),
        }
    }
}

impl AudioHost for FakeHost {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut state = self.state.borrow_mut();
        if let Some(token) = state.enumeration_interrupt.take() {
            let outcome = token.interrupt();
            state.enumeration_interrupts.push(outcome);
        }
        Ok(state.devices.clone())
    }

    fn play(
        &self,
        device: usize,
        buffer: &SampleBuffer,
        sample_rate: u32,
        cancel: &CancelToken,
    ) -> Result<Completion> {
        self.check_stream(cancel)?;
        let mut state = self.state.borrow_mut();
        state.played.push(Played {
            device,
            channels: buffer.channels(),
            frames: buffer.frames(),
            sample_rate,
        });
        if state.interrupt_playback {
            Ok(Completion::Interrupted)
        } else {
            Ok(Completion::Finished)
        }
    }

    fn monitor(
        &self,
        request: MeterRequest,
        cancel: &CancelToken,
        on_level: &mut dyn FnMut(f32),
    ) -> Result<Completion> {
        self.check_stream(cancel)?;
        let levels = {
            let mut state = self.state.borrow_mut();
            state.meter_requests.push(request);
            std::mem::take(&mut state.levels)
        };
        for db in levels {
            on_level(db);
        }
        cancel.cancel();
        Ok(Completion::Interrupted)
    }

    fn loopback(&self, request: LoopbackRequest, cancel: &CancelToken) -> Result<Completion> {
        self.check_stream(cancel)?;
        self.state.borrow_mut().loopback_requests.push(request);
        cancel.cancel();
        Ok(Completion::Interrupted)
    }
}
