//! Microphone to headphone passthrough
//!
//! Two cpal streams share one sample rate and are joined by an SPSC queue.
//! The input callback reshapes each block to the output channel count; the
//! output callback drains the queue and plays silence on underrun.

use cpal::traits::DeviceTrait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::device::{negotiate_config, open_device};
use super::engine::{error_callback, ActiveStream};
use super::host::{wait_for_stream, AudioBlockConsumer, Completion, LoopbackRequest, StreamStatus};
use super::mixer::{drain_into, loopback_queue, LoopbackMixer};
use super::selector::Direction;
use crate::cancel::CancelToken;
use crate::error::{Result, TesterError};

/// Queue capacity in blocks
const QUEUE_BLOCKS: usize = 8;

/// Approximate added latency of one block, in milliseconds
pub fn block_latency_ms(block_size: u32, sample_rate: u32) -> f64 {
    block_size as f64 / sample_rate as f64 * 1000.0
}

/// Run the passthrough until cancelled
pub fn run_loopback(
    host: &cpal::Host,
    request: LoopbackRequest,
    poll_interval: Duration,
    cancel: &CancelToken,
) -> Result<Completion> {
    let input_device = open_device(host, request.input_device)?;
    let output_device = open_device(host, request.output_device)?;
    let input_name = input_device.name().unwrap_or_else(|_| "Unknown".to_string());
    let output_name = output_device.name().unwrap_or_else(|_| "Unknown".to_string());

    let input_config = negotiate_config(
        &input_device,
        Direction::Input,
        request.input_channels as u16,
        request.sample_rate,
        request.block_size,
    )?;
    let output_config = negotiate_config(
        &output_device,
        Direction::Output,
        request.output_channels as u16,
        request.sample_rate,
        request.block_size,
    )?;
    let in_channels = input_config.channels as usize;
    let out_channels = output_config.channels as usize;
    let block = request.block_size as usize;

    log::info!(
        "Loopback {} ({} ch) -> {} ({} ch) at {} Hz, block {}",
        input_name,
        in_channels,
        output_name,
        out_channels,
        request.sample_rate,
        block
    );

    let (producer, mut consumer) = loopback_queue(block * out_channels * QUEUE_BLOCKS, block * out_channels);
    let mut mixer = LoopbackMixer::new(in_channels, out_channels, block, producer);
    let dropped = mixer.dropped_counter();
    let underruns = Arc::new(AtomicUsize::new(0));
    let underruns_cb = Arc::clone(&underruns);

    let status = StreamStatus::new();

    let output_stream = output_device
        .build_output_stream(
            &output_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if drain_into(&mut consumer, data) < data.len() {
                    underruns_cb.fetch_add(1, Ordering::Relaxed);
                }
            },
            error_callback(&status, "Output"),
            None,
        )
        .map_err(|e| TesterError::driver("Failed to build output stream", e))?;

    let input_stream = input_device
        .build_input_stream(
            &input_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| mixer.consume(data),
            error_callback(&status, "Input"),
            None,
        )
        .map_err(|e| TesterError::driver("Failed to build input stream", e))?;

    // Output first so the pre-filled silence starts playing right away
    let output_stream = ActiveStream::start(output_stream, format!("loopback output on {}", output_name))?;
    let input_stream = ActiveStream::start(input_stream, format!("loopback input on {}", input_name))?;

    let outcome = wait_for_stream(&status, cancel, poll_interval, || {}, || false);

    drop(input_stream);
    drop(output_stream);

    let dropped = dropped.load(Ordering::Relaxed);
    let underruns = underruns.load(Ordering::Relaxed);
    if dropped > 0 || underruns > 0 {
        log::warn!(
            "Loopback dropped {} samples, {} output underruns",
            dropped,
            underruns
        );
    }

    outcome
}
