// SPDX-License-Identifier: GPL-3.0-only

//! Compiled-in defaults
//!
//! Every runtime parameter of the publisher starts from one of these values.
//! There is no configuration file; the command line can override them.

use std::time::Duration;

/// Topic the depth arrays are published on
pub const DEFAULT_TOPIC: &str = "quad/depth";

/// Pending messages retained per subscriber before the oldest are dropped
pub const DEFAULT_QUEUE_SIZE: usize = 1000;

/// Largest accepted per-subscriber queue
pub const MAX_QUEUE_SIZE: usize = 65_536;

/// Maximum reported depth, in the configured measurement unit
pub const DEFAULT_DEPTH_CLAMP: f32 = 15.0;

/// Address the TCP topic server listens on
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7447";

/// Nominal pacing rate for flight-controller consumers
///
/// Throttling is off unless `max_rate_hz` is set explicitly; this is the
/// value to pass when a 10 Hz cap is wanted.
pub const INTENDED_RATE_HZ: f64 = 10.0;

/// Upper bound on a single encoded frame on the wire
pub const MAX_WIRE_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// How often the TCP accept loop checks for shutdown
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Preview image name that is overwritten on every preview write
pub const PREVIEW_LATEST_FILENAME: &str = "depth_latest.png";

/// Stereo camera resolution presets as (width, height) per sensor
pub mod resolution {
    pub const HD2K: (u32, u32) = (2208, 1242);
    pub const HD1080: (u32, u32) = (1920, 1080);
    pub const HD720: (u32, u32) = (1280, 720);
    pub const VGA: (u32, u32) = (672, 376);
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
