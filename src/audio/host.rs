//! Boundary between the tester and the audio subsystem
//!
//! The session only talks to an [`AudioHost`]; the cpal implementation lives
//! in [`super::engine`]. Real-time work handed to the driver is expressed as
//! an [`AudioBlockConsumer`].

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::device::DeviceInfo;
use super::signals::SampleBuffer;
use crate::cancel::CancelToken;
use crate::error::{Result, TesterError};

/// Work invoked by the stream driver once per incoming block.
///
/// Runs on the driver's real-time thread: implementations must not block,
/// do I/O, or allocate in the steady state.
pub trait AudioBlockConsumer: Send + 'static {
    /// `input` is interleaved in the stream's channel layout
    fn consume(&mut self, input: &[f32]);
}

/// How a blocking operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Interrupted,
}

/// Parameters for the level meter stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterRequest {
    pub device: usize,
    pub sample_rate: u32,
    pub block_size: u32,
}

/// Parameters for a loopback session, fixed at session start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopbackRequest {
    pub input_device: usize,
    pub output_device: usize,
    pub input_channels: usize,
    pub output_channels: usize,
    pub sample_rate: u32,
    pub block_size: u32,
}

/// The audio subsystem as seen by the session.
///
/// Every method that opens a stream blocks until the operation ends and
/// releases the stream before returning, whichever way it ended.
pub trait AudioHost {
    /// Device table in enumeration order; position is the device index
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Play a buffer to completion or until cancelled
    fn play(
        &self,
        device: usize,
        buffer: &SampleBuffer,
        sample_rate: u32,
        cancel: &CancelToken,
    ) -> Result<Completion>;

    /// Run the level meter until cancelled, handing each reading (dB) to
    /// `on_level` on the calling thread
    fn monitor(
        &self,
        request: MeterRequest,
        cancel: &CancelToken,
        on_level: &mut dyn FnMut(f32),
    ) -> Result<Completion>;

    /// Pass input through to output until cancelled
    fn loopback(&self, request: LoopbackRequest, cancel: &CancelToken) -> Result<Completion>;
}

/// State shared between a running stream's callbacks and the waiting thread
#[derive(Default)]
pub struct StreamStatus {
    finished: AtomicBool,
    error: RwLock<Option<String>>,
}

impl StreamStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Record a stream error; the first one wins
    pub fn report_error(&self, message: String) {
        let mut slot = self.error.write();
        if slot.is_none() {
            *slot = Some(message);
        }
    }

    pub fn take_error(&self) -> Option<String> {
        self.error.write().take()
    }
}

/// Poll until `done` says so, the token is cancelled, or the stream reports
/// an error. `tick` runs on every pass and may drain queued data.
pub fn wait_for_stream(
    status: &StreamStatus,
    cancel: &CancelToken,
    poll_interval: Duration,
    mut tick: impl FnMut(),
    done: impl Fn() -> bool,
) -> Result<Completion> {
    loop {
        tick();
        if let Some(err) = status.take_error() {
            return Err(TesterError::Driver(err));
        }
        if cancel.is_cancelled() {
            return Ok(Completion::Interrupted);
        }
        if done() {
            return Ok(Completion::Finished);
        }
        std::thread::sleep(poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn test_wait_finishes() {
        let status = StreamStatus::new();
        let cancel = CancelToken::new();
        let mut ticks = 0;
        let result = wait_for_stream(&status, &cancel, POLL, || ticks += 1, || true).unwrap();
        assert_eq!(result, Completion::Finished);
        assert_eq!(ticks, 1);
    }

    #[test]
    fn test_wait_sees_cancel() {
        let status = StreamStatus::new();
        let cancel = CancelToken::new();
        let _armed = cancel.arm();
        cancel.cancel();
        let result = wait_for_stream(&status, &cancel, POLL, || {}, || false).unwrap();
        assert_eq!(result, Completion::Interrupted);
    }

    #[test]
    fn test_wait_surfaces_stream_error() {
        let status = StreamStatus::new();
        status.report_error("device unplugged".into());
        status.report_error("second".into());
        let cancel = CancelToken::new();
        let err = wait_for_stream(&status, &cancel, POLL, || {}, || false).unwrap_err();
        assert!(matches!(err, TesterError::Driver(ref m) if m == "device unplugged"));
    }

    #[test]
    fn test_wait_polls_until_done() {
        let status = StreamStatus::new();
        let cancel = CancelToken::new();
        let flag = status.clone();
        let mut ticks = 0;
        let result = wait_for_stream(
            &status,
            &cancel,
            POLL,
            || {
                ticks += 1;
                if ticks == 3 {
                    flag.mark_finished();
                }
            },
            || status.is_finished(),
        )
        .unwrap();
        assert_eq!(result, Completion::Finished);
        assert_eq!(ticks, 3);
    }
}
