// SPDX-License-Identifier: GPL-3.0-only

//! Loop control shared by the acquisition loop and its callers
//!
//! A [`StopSignal`] is the only state shared between the acquisition thread
//! and the outside world. It is checked between iterations, never during a
//! blocking capture.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Action returned by one loop iteration to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Cloneable stop flag
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after its current iteration (non-blocking)
    pub fn request_stop(&self) {
        debug!("Stop requested");
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether a stop has been requested
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Route SIGINT/SIGTERM into this signal
    ///
    /// Can only be installed once per process.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            info!("Shutdown signal received");
            signal.request_stop();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stop_signal_shared_between_clones() {
        let signal = StopSignal::new();
        let remote = signal.clone();
        assert!(!signal.is_stop_requested());

        thread::spawn(move || remote.request_stop()).join().unwrap();
        assert!(signal.is_stop_requested());
    }
}
