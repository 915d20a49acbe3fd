//! cpal-backed audio host: device table and buffered playback

use cpal::traits::{DeviceTrait, StreamTrait};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::device::{list_devices, negotiate_config, open_device, DeviceInfo};
use super::host::{wait_for_stream, AudioHost, Completion, LoopbackRequest, MeterRequest, StreamStatus};
use super::mixer::copy_channels;
use super::selector::Direction;
use super::signals::SampleBuffer;
use super::{input, loopback};
use crate::cancel::CancelToken;
use crate::error::{Result, TesterError};

/// Preferred output block for buffered playback
const PLAYBACK_BLOCK_SIZE: u32 = 512;

/// Time to let the device play out after the last sample was handed over:
/// two periods of the stream
pub fn drain_time(period_frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(period_frames as f64 * 2.0 / sample_rate as f64)
}

/// A running cpal stream. Dropping it stops the stream and releases the
/// device.
pub struct ActiveStream {
    _stream: cpal::Stream,
    label: String,
}

impl ActiveStream {
    /// Start `stream` and take ownership of it
    pub fn start(stream: cpal::Stream, label: String) -> Result<Self> {
        stream
            .play()
            .map_err(|e| TesterError::driver(&format!("Failed to start {}", label), e))?;
        log::info!("Stream started: {}", label);
        Ok(Self {
            _stream: stream,
            label,
        })
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        log::info!("Stream closed: {}", self.label);
    }
}

/// Error callback that logs and parks the message for the waiting thread
pub(crate) fn error_callback(
    status: &Arc<StreamStatus>,
    what: &'static str,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    let status = Arc::clone(status);
    move |err| {
        log::error!("{} stream error: {}", what, err);
        status.report_error(err.to_string());
    }
}

/// Audio host backed by the platform's default cpal host
pub struct CpalHost {
    host: cpal::Host,
    poll_interval: Duration,
}

impl CpalHost {
    pub fn new(poll_interval: Duration) -> Self {
        let host = cpal::default_host();
        log::info!("Using audio host {:?}", host.id());
        Self {
            host,
            poll_interval,
        }
    }
}

impl AudioHost for CpalHost {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        list_devices(&self.host)
    }

    fn play(
        &self,
        device_index: usize,
        buffer: &SampleBuffer,
        sample_rate: u32,
        cancel: &CancelToken,
    ) -> Result<Completion> {
        let device = open_device(&self.host, device_index)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let config = negotiate_config(
            &device,
            Direction::Output,
            buffer.channels() as u16,
            sample_rate,
            PLAYBACK_BLOCK_SIZE,
        )?;
        let channels = config.channels as usize;

        log::info!(
            "Playing {:.2}s on {}: {} Hz, {} channels",
            buffer.duration_secs(sample_rate),
            name,
            sample_rate,
            channels
        );

        // Reshape to the stream's channel count before handing it over
        let mut samples = vec![0.0f32; buffer.frames() * channels];
        copy_channels(buffer.samples(), buffer.channels(), &mut samples, channels);

        let status = StreamStatus::new();
        let callback_status = Arc::clone(&status);
        let mut position = 0usize;

        // Largest period the driver asked for, in frames
        let fixed_period = match config.buffer_size {
            cpal::BufferSize::Fixed(frames) => frames as usize,
            cpal::BufferSize::Default => 0,
        };
        let period = Arc::new(AtomicUsize::new(fixed_period));
        let callback_period = Arc::clone(&period);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback_period.fetch_max(data.len() / channels.max(1), Ordering::Relaxed);
                    let count = (samples.len() - position).min(data.len());
                    data[..count].copy_from_slice(&samples[position..position + count]);
                    data[count..].fill(0.0);
                    position += count;
                    if position >= samples.len() {
                        callback_status.mark_finished();
                    }
                },
                error_callback(&status, "Output"),
                None,
            )
            .map_err(|e| TesterError::driver("Failed to build output stream", e))?;

        let stream = ActiveStream::start(stream, format!("playback on {}", name))?;
        let outcome = wait_for_stream(&status, cancel, self.poll_interval, || {}, || status.is_finished())?;

        if outcome == Completion::Finished {
            // The last period is still in the device buffer
            std::thread::sleep(drain_time(period.load(Ordering::Relaxed), sample_rate));
        }
        drop(stream);
        Ok(outcome)
    }

    fn monitor(
        &self,
        request: MeterRequest,
        cancel: &CancelToken,
        on_level: &mut dyn FnMut(f32),
    ) -> Result<Completion> {
        input::run_level_meter(&self.host, request, self.poll_interval, cancel, on_level)
    }

    fn loopback(&self, request: LoopbackRequest, cancel: &CancelToken) -> Result<Completion> {
        loopback::run_loopback(&self.host, request, self.poll_interval, cancel)
    }
}
