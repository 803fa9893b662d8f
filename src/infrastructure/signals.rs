//! Keeps the launcher alive while the finder owns the terminal.
//!
//! Ctrl-C inside an `execute(...)` action reaches the whole foreground process
//! group, launcher included. The finder decides when a session ends, so the
//! launcher catches the terminating signals and lets its own cleanup run once
//! the finder exits.

use crate::domain::error::Result;
use signal_hook::iterator::{Handle, Signals};
use std::thread::{self, JoinHandle};

/// Signals the launcher absorbs while a session runs.
pub const HELD_SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

/// Catches [`HELD_SIGNALS`] until dropped.
///
/// Caught handlers are reset to the default by `exec`, so children spawned
/// while the guard is alive still receive these signals normally.
pub struct SignalGuard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalGuard {
    /// Starts catching [`HELD_SIGNALS`].
    ///
    /// # Errors
    ///
    /// I/O errors from installing the handlers.
    pub fn hold() -> Result<Self> {
        let mut signals = Signals::new(HELD_SIGNALS)?;
        let handle = signals.handle();
        let thread = thread::spawn(move || {
            for signal in signals.forever() {
                tracing::debug!(signal, "signal held until the finder exits");
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl std::fmt::Debug for SignalGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_signal_does_not_terminate_the_process() {
        let guard = SignalGuard::hold().unwrap();
        let rc = unsafe { libc::kill(libc::getpid(), libc::SIGHUP) };
        assert_eq!(rc, 0);
        // Delivery is asynchronous; give the handler a moment.
        thread::sleep(std::time::Duration::from_millis(50));
        drop(guard);
    }
}
