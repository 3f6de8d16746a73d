// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, CameraConfig, SensingMode};
use crate::constants::{DEFAULT_BIND_ADDR, DEFAULT_QUEUE_SIZE, DEFAULT_TOPIC, MAX_QUEUE_SIZE};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the acquisition loop does when grabbing or retrieving a frame fails
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum,
)]
pub enum CaptureErrorPolicy {
    /// Log, count, and move on to the next frame without publishing
    #[default]
    Skip,
    /// Stop the loop and report the error
    Abort,
}

/// Publisher configuration
///
/// Built once at startup from compiled-in defaults plus command line
/// overrides, then never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Camera open parameters
    pub camera: CameraConfig,
    /// Camera backend to open
    pub backend: CameraBackendType,
    /// Sensing mode used for every grab
    pub sensing_mode: SensingMode,
    /// Topic the depth arrays are published on
    pub topic: String,
    /// Pending messages retained per subscriber
    pub queue_size: usize,
    /// Address the TCP topic server listens on
    pub bind_addr: String,
    /// Loop pacing cap; unthrottled when unset
    pub max_rate_hz: Option<f64>,
    /// Reaction to capture or retrieval failures
    pub on_capture_error: CaptureErrorPolicy,
    /// Directory depth previews are written to
    pub preview_dir: Option<PathBuf>,
    /// Write a preview every N published frames (0 disables previews)
    pub preview_every: u32,
    /// Stop after this many loop iterations
    pub max_frames: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            backend: CameraBackendType::default(),
            sensing_mode: SensingMode::Fill,
            topic: DEFAULT_TOPIC.to_string(),
            queue_size: DEFAULT_QUEUE_SIZE,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_rate_hz: None, // Unthrottled, bounded by the device
            on_capture_error: CaptureErrorPolicy::default(),
            preview_dir: None,
            preview_every: 0,
            max_frames: None,
        }
    }
}

impl Config {
    /// Reject values the publisher cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.topic.trim().is_empty() {
            return Err(AppError::Config("topic name must not be empty".into()));
        }
        if !(1..=MAX_QUEUE_SIZE).contains(&self.queue_size) {
            return Err(AppError::Config(format!(
                "queue size must be between 1 and {}, got {}",
                MAX_QUEUE_SIZE, self.queue_size
            )));
        }
        if let Some(hz) = self.max_rate_hz
            && !(hz.is_finite() && hz > 0.0)
        {
            return Err(AppError::Config(format!(
                "max rate must be a positive number of hertz, got {}",
                hz
            )));
        }
        if !(self.camera.depth_clamp.is_finite() && self.camera.depth_clamp > 0.0) {
            return Err(AppError::Config(format!(
                "depth clamp must be positive, got {}",
                self.camera.depth_clamp
            )));
        }
        Ok(())
    }

    /// Directory previews go to, if previews are enabled
    ///
    /// Falls back to the user cache directory when none was given.
    pub fn preview_directory(&self) -> Option<PathBuf> {
        if self.preview_every == 0 {
            return None;
        }
        self.preview_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("depthpub")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_rate() {
        for hz in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let config = Config {
                max_rate_hz: Some(hz),
                ..Config::default()
            };
            assert!(config.validate().is_err(), "{} Hz should be rejected", hz);
        }
    }

    #[test]
    fn test_preview_disabled_by_default() {
        assert_eq!(Config::default().preview_directory(), None);
    }

    #[test]
    fn test_explicit_preview_dir_wins() {
        let config = Config {
            preview_every: 5,
            preview_dir: Some(PathBuf::from("/tmp/previews")),
            ..Config::default()
        };
        assert_eq!(
            config.preview_directory(),
            Some(PathBuf::from("/tmp/previews"))
        );
    }
}
