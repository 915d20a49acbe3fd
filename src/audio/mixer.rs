//! Channel adaptation for the loopback path
//!
//! Input blocks are reshaped to the output channel count before they reach
//! the output stream: a narrower input has its first channel copied to every
//! output, a wider input is cut down to the first output channels.

use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::host::AudioBlockConsumer;

/// Loopback never exceeds stereo
pub const MAX_LOOPBACK_CHANNELS: usize = 2;

/// Channel counts for a loopback session from the devices' maxima
pub fn loopback_channels(max_input: usize, max_output: usize) -> (usize, usize) {
    (
        max_input.min(MAX_LOOPBACK_CHANNELS),
        max_output.min(MAX_LOOPBACK_CHANNELS),
    )
}

/// Copy interleaved `input` into interleaved `output`, adapting channel count.
///
/// Returns the number of frames written. Output frames past the end of the
/// input are zeroed so the block is always fully defined.
pub fn mix_block(input: &[f32], in_channels: usize, output: &mut [f32], out_channels: usize) -> usize {
    if out_channels == 0 {
        return 0;
    }
    if in_channels == 0 {
        output.fill(0.0);
        return 0;
    }

    let frames = (input.len() / in_channels).min(output.len() / out_channels);
    let in_frames = input.chunks_exact(in_channels);
    let out_frames = output.chunks_exact_mut(out_channels);

    for (src, dst) in in_frames.zip(out_frames).take(frames) {
        if in_channels < out_channels {
            dst.fill(src[0]);
        } else {
            dst.copy_from_slice(&src[..out_channels]);
        }
    }

    output[frames * out_channels..].fill(0.0);
    frames
}

/// Copy interleaved `input` into interleaved `output` channel by channel.
///
/// Channel `n` of the input lands on channel `n` of the output; output
/// channels with no counterpart stay silent and extra input channels are
/// dropped. Used for playback, where a stereo buffer belongs on the first two
/// outputs only. Returns the number of frames written.
pub fn copy_channels(input: &[f32], in_channels: usize, output: &mut [f32], out_channels: usize) -> usize {
    output.fill(0.0);
    if in_channels == 0 || out_channels == 0 {
        return 0;
    }

    let shared = in_channels.min(out_channels);
    let frames = (input.len() / in_channels).min(output.len() / out_channels);
    for (src, dst) in input
        .chunks_exact(in_channels)
        .zip(output.chunks_exact_mut(out_channels))
        .take(frames)
    {
        dst[..shared].copy_from_slice(&src[..shared]);
    }
    frames
}

/// Input-callback side of the loopback: adapts channels and queues samples
/// for the output callback.
pub struct LoopbackMixer {
    in_channels: usize,
    out_channels: usize,
    scratch: Vec<f32>,
    queue: ringbuf::HeapProd<f32>,
    dropped: Arc<AtomicUsize>,
}

impl LoopbackMixer {
    /// `max_block_frames` sizes the scratch buffer up front so the callback
    /// doesn't allocate for blocks up to that size.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        max_block_frames: usize,
        queue: ringbuf::HeapProd<f32>,
    ) -> Self {
        Self {
            in_channels,
            out_channels,
            scratch: vec![0.0; max_block_frames * out_channels],
            queue,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of samples discarded because the output side was not keeping
    /// up. Stays readable after the mixer moves into a callback.
    pub fn dropped_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.dropped)
    }
}

impl AudioBlockConsumer for LoopbackMixer {
    fn consume(&mut self, input: &[f32]) {
        if self.in_channels == 0 || self.out_channels == 0 {
            return;
        }
        let frames = input.len() / self.in_channels;
        let needed = frames * self.out_channels;
        if self.scratch.len() < needed {
            // Driver handed us a larger block than negotiated
            self.scratch.resize(needed, 0.0);
        }
        let written = mix_block(input, self.in_channels, &mut self.scratch[..needed], self.out_channels);
        let samples = written * self.out_channels;
        let pushed = self.queue.push_slice(&self.scratch[..samples]);
        if pushed < samples {
            self.dropped.fetch_add(samples - pushed, Ordering::Relaxed);
        }
    }
}

/// Queue joining the loopback input and output callbacks, pre-filled with
/// `prefill` samples of silence.
pub fn loopback_queue(capacity: usize, prefill: usize) -> (ringbuf::HeapProd<f32>, ringbuf::HeapCons<f32>) {
    let rb = HeapRb::new(capacity.max(prefill).max(1));
    let (mut producer, consumer) = rb.split();
    for _ in 0..prefill {
        let _ = producer.try_push(0.0);
    }
    (producer, consumer)
}

/// Fill an output block from the queue, zero-filling on underrun.
/// Returns the number of samples that came from the queue.
pub fn drain_into(queue: &mut ringbuf::HeapCons<f32>, output: &mut [f32]) -> usize {
    let popped = queue.pop_slice(output);
    output[popped..].fill(0.0);
    popped
}
