// SPDX-License-Identifier: GPL-3.0-only

//! Depth camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Acquisition loop    │
//! └──────────┬───────────┘
//!            │ grab / retrieve_measure
//!            ▼
//! ┌──────────────────────┐
//! │  DepthCamera trait   │  ← Common interface
//! └──────────┬───────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌───────┐ ┌───────────┐
//!   │ V4L2  │ │ Simulated │
//!   └───────┘ └───────────┘
//! ```
//!
//! A camera is opened once with a [`CameraConfig`] and owned exclusively by
//! its caller. Dropping it releases the device.

pub mod format_converters;
pub mod simulated;
pub mod types;
#[cfg(feature = "v4l2")]
pub mod v4l2_depth;

pub use simulated::SimulatedCamera;
pub use types::*;

use crate::errors::{DeviceError, DeviceResult, InitErrorCode};
use tracing::info;

/// Depth camera device
///
/// Capture is split in two steps like a stereo SDK: `grab` blocks until the
/// device delivers a frame, `retrieve_measure` then computes a measurement of
/// that frame into a caller-owned grid.
pub trait DepthCamera: Send {
    /// Device name or path, for logging
    fn name(&self) -> &str;

    /// Frame size reported by the device; fixed once opened
    fn resolution(&self) -> (u32, u32);

    /// Set the maximum reported depth in the configured unit
    fn set_depth_clamp(&mut self, clamp: f32);

    /// Capture the next frame
    ///
    /// Blocks until the device delivers a frame or fails. There is no timeout.
    fn grab(&mut self, mode: SensingMode) -> DeviceResult<()>;

    /// Write a measurement of the last grabbed frame into `grid`
    ///
    /// The grid must match [`DepthCamera::resolution`].
    fn retrieve_measure(&mut self, measure: Measure, grid: &mut DepthGrid) -> DeviceResult<()>;
}

/// Open a camera on the given backend
pub fn open_camera(
    backend: CameraBackendType,
    config: &CameraConfig,
) -> DeviceResult<Box<dyn DepthCamera>> {
    info!(backend = %backend, resolution = ?config.resolution, "Opening depth camera");

    match backend {
        CameraBackendType::Simulated => Ok(Box::new(SimulatedCamera::open(config)?)),
        #[cfg(feature = "v4l2")]
        CameraBackendType::V4l2 => Ok(Box::new(v4l2_depth::V4l2DepthCamera::open(config)?)),
        #[cfg(not(feature = "v4l2"))]
        CameraBackendType::V4l2 => Err(DeviceError::init(
            InitErrorCode::Unsupported,
            "built without the v4l2 feature",
        )),
    }
}

/// Enumerate cameras on every compiled-in backend
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    #[allow(unused_mut)]
    let mut cameras = vec![CameraDevice {
        name: "Simulated stereo camera".to_string(),
        path: simulated::SIMULATED_DEVICE_PATH.to_string(),
        driver: "sim".to_string(),
    }];

    #[cfg(feature = "v4l2")]
    cameras.extend(v4l2_depth::enumerate_depth_nodes());

    cameras
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_simulated() {
        let camera = open_camera(CameraBackendType::Simulated, &CameraConfig::default()).unwrap();
        assert_eq!(camera.resolution(), (672, 376));
    }

    #[cfg(not(feature = "v4l2"))]
    #[test]
    fn test_v4l2_unavailable_is_init_failure() {
        let result = open_camera(CameraBackendType::V4l2, &CameraConfig::default());
        assert!(matches!(
            result,
            Err(DeviceError::InitFailed {
                code: InitErrorCode::Unsupported,
                ..
            })
        ));
    }

    #[test]
    fn test_enumerate_lists_simulated() {
        assert!(
            enumerate_cameras()
                .iter()
                .any(|c| c.path == simulated::SIMULATED_DEVICE_PATH)
        );
    }
}
