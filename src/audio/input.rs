//! Live microphone level metering using cpal
//!
//! The input callback only computes a dB value per block and pushes it into a
//! lock-free queue. Draining and rendering happen on the calling thread
//! between polls.

use cpal::traits::DeviceTrait;
use std::time::Duration;

use super::device::{negotiate_config, open_device};
use super::engine::{error_callback, ActiveStream};
use super::host::{wait_for_stream, AudioBlockConsumer, Completion, MeterRequest, StreamStatus};
use super::meter::LevelMeter;
use super::selector::Direction;
use crate::cancel::CancelToken;
use crate::error::{Result, TesterError};

/// Readings buffered between polls; ~1.4 s of blocks at 1024 frames / 48 kHz
const READING_QUEUE_CAPACITY: usize = 64;

/// Meter the input device until cancelled
pub fn run_level_meter(
    host: &cpal::Host,
    request: MeterRequest,
    poll_interval: Duration,
    cancel: &CancelToken,
    on_level: &mut dyn FnMut(f32),
) -> Result<Completion> {
    let device = open_device(host, request.device)?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    // Mono is enough; the meter reads the first channel of whatever we get
    let config = negotiate_config(
        &device,
        Direction::Input,
        1,
        request.sample_rate,
        request.block_size,
    )?;

    log::info!(
        "Input meter config for {}: {} Hz, {} channels, {:?}",
        name,
        config.sample_rate.0,
        config.channels,
        config.buffer_size
    );

    let (mut meter, mut readings) = LevelMeter::new(config.channels as usize, READING_QUEUE_CAPACITY);
    let status = StreamStatus::new();

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| meter.consume(data),
            error_callback(&status, "Input"),
            None,
        )
        .map_err(|e| TesterError::driver("Failed to build input stream", e))?;

    let _stream = ActiveStream::start(stream, format!("level meter on {}", name))?;

    wait_for_stream(
        &status,
        cancel,
        poll_interval,
        || {
            if let Some(db) = readings.latest() {
                on_level(db);
            }
        },
        || false,
    )
}
