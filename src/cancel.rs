//! Cancellation token for blocking audio operations
//!
//! The Ctrl+C handler calls [`CancelToken::interrupt`]. While an operation is
//! armed the interrupt only sets a flag that the operation's wait loop polls;
//! with nothing armed the caller decides what an interrupt means (the binary
//! ends the session).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct TokenState {
    armed: AtomicBool,
    cancelled: AtomicBool,
}

/// Cheap to clone; all clones share one state
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

/// What an interrupt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// A running operation was asked to stop
    Cancelled,
    /// Nothing was running
    Idle,
}

/// Keeps the token armed while alive; disarms and clears on drop
pub struct ArmedGuard<'a> {
    token: &'a CancelToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an operation as running. Clears any stale cancellation first.
    pub fn arm(&self) -> ArmedGuard<'_> {
        self.state.cancelled.store(false, Ordering::SeqCst);
        self.state.armed.store(true, Ordering::SeqCst);
        ArmedGuard { token: self }
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Entry point for the signal handler
    pub fn interrupt(&self) -> Interrupt {
        if self.is_armed() {
            self.cancel();
            Interrupt::Cancelled
        } else {
            Interrupt::Idle
        }
    }
}

impl Drop for ArmedGuard<'_> {
    fn drop(&mut self) {
        self.token.state.armed.store(false, Ordering::SeqCst);
        self.token.state.cancelled.store(false, Ordering::SeqCst);
    }
}
