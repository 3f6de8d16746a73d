// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic stereo depth camera
//!
//! Produces a deterministic scene: a ground plane receding towards the top of
//! the image with a sphere sweeping across it. A sparse, frame-dependent set
//! of pixels has no stereo match, so the sensing mode matters just as it does
//! on real hardware.

use super::DepthCamera;
use super::format_converters::postprocess_depth;
use super::types::*;
use crate::errors::{DeviceError, DeviceResult};
use tracing::{debug, info};

/// Device path reported for the simulated camera
pub const SIMULATED_DEVICE_PATH: &str = "sim://stereo";

/// Synthetic depth camera with optional fault injection
pub struct SimulatedCamera {
    config: CameraConfig,
    width: u32,
    height: u32,
    depth_clamp: f32,
    /// Frames grabbed so far
    frame: u64,
    /// Sensing mode of the last successful grab
    grabbed: Option<SensingMode>,
    /// Fail every Nth grab
    fail_every: Option<u64>,
}

impl SimulatedCamera {
    /// Open the simulated camera with the given configuration
    pub fn open(config: &CameraConfig) -> DeviceResult<Self> {
        let (width, height) = config.resolution.dimensions();
        info!(
            width,
            height,
            mode = ?config.depth_mode,
            unit = ?config.unit,
            "Simulated stereo camera opened"
        );

        Ok(Self {
            config: config.clone(),
            width,
            height,
            depth_clamp: config.depth_clamp,
            frame: 0,
            grabbed: None,
            fail_every: None,
        })
    }

    /// Make every `n`th grab fail with a capture error
    pub fn with_capture_failures(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Frames grabbed so far, including failed grabs
    pub fn frames_grabbed(&self) -> u64 {
        self.frame
    }

    fn noise_amplitude(&self) -> f32 {
        match self.config.depth_mode {
            DepthMode::Performance => 0.02,
            DepthMode::Quality => 0.01,
            DepthMode::Ultra => 0.005,
        }
    }

    /// Scene depth in meters, or None where stereo matching fails
    fn scene_depth(&self, row: u32, col: u32) -> Option<f32> {
        let w = self.width as f32;
        let h = self.height as f32;
        let x = col as f32 / w;
        let y = row as f32 / h;

        // Holes move every frame
        let hash = pixel_hash(row, col, self.frame);
        if hash % 97 == 0 {
            return None;
        }

        // Ground plane: 1.5 m at the bottom row, 25 m at the top
        let mut depth = 1.5 + (1.0 - y).powi(2) * 23.5;

        // Sphere sweeping left to right, one pass every 120 frames
        let cx = (self.frame % 120) as f32 / 120.0;
        let (dx, dy) = (x - cx, y - 0.5);
        let r2 = dx * dx + dy * dy;
        if r2 < 0.01 {
            depth = depth.min(3.0 - (0.01 - r2).sqrt() * 5.0);
        }

        let noise = ((hash % 1000) as f32 / 1000.0 - 0.5) * 2.0 * self.noise_amplitude();
        Some(depth + noise)
    }
}

fn pixel_hash(row: u32, col: u32, frame: u64) -> u64 {
    let mut h = (row as u64) << 32 | col as u64;
    h ^= frame.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^ (h >> 31)
}

impl DepthCamera for SimulatedCamera {
    fn name(&self) -> &str {
        SIMULATED_DEVICE_PATH
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_depth_clamp(&mut self, clamp: f32) {
        self.depth_clamp = clamp;
    }

    fn grab(&mut self, mode: SensingMode) -> DeviceResult<()> {
        self.frame += 1;
        self.grabbed = None;

        if let Some(n) = self.fail_every
            && self.frame % n == 0
        {
            return Err(DeviceError::CaptureFailed(format!(
                "injected failure on frame {}",
                self.frame
            )));
        }

        self.grabbed = Some(mode);
        Ok(())
    }

    fn retrieve_measure(&mut self, measure: Measure, grid: &mut DepthGrid) -> DeviceResult<()> {
        let Some(mode) = self.grabbed else {
            return Err(DeviceError::RetrieveFailed(
                "no frame has been grabbed".to_string(),
            ));
        };
        if (grid.width(), grid.height()) != (self.width, self.height) {
            return Err(DeviceError::RetrieveFailed(format!(
                "grid is {}x{}, camera is {}x{}",
                grid.width(),
                grid.height(),
                self.width,
                self.height
            )));
        }

        match measure {
            Measure::Depth => {
                let unit = self.config.unit;
                let width = self.width;
                let rows = grid.as_mut_slice().chunks_exact_mut(width as usize);
                for (row, values) in (0..self.height).zip(rows) {
                    for (col, value) in (0..width).zip(values.iter_mut()) {
                        *value = match self.scene_depth(row, col) {
                            Some(m) => unit.from_meters(m),
                            None => f32::NAN,
                        };
                    }
                }
                postprocess_depth(grid, mode, self.depth_clamp);
            }
        }

        Ok(())
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        debug!(frames = self.frame, "Simulated stereo camera closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> SimulatedCamera {
        SimulatedCamera::open(&CameraConfig::default()).unwrap()
    }

    #[test]
    fn test_reports_preset_resolution() {
        assert_eq!(camera().resolution(), (672, 376));
    }

    #[test]
    fn test_retrieve_requires_grab() {
        let mut cam = camera();
        let mut grid = DepthGrid::new(672, 376);
        assert!(cam.retrieve_measure(Measure::Depth, &mut grid).is_err());
    }

    #[test]
    fn test_fill_mode_has_no_holes() {
        let mut cam = camera();
        let mut grid = DepthGrid::new(672, 376);
        cam.grab(SensingMode::Fill).unwrap();
        cam.retrieve_measure(Measure::Depth, &mut grid).unwrap();
        assert!(grid.as_slice().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_standard_mode_leaves_holes() {
        let mut cam = camera();
        let mut grid = DepthGrid::new(672, 376);
        cam.grab(SensingMode::Standard).unwrap();
        cam.retrieve_measure(Measure::Depth, &mut grid).unwrap();
        assert!(grid.as_slice().iter().any(|v| v.is_nan()));
    }

    #[test]
    fn test_clamp_marks_far_points() {
        let mut cam = camera();
        cam.set_depth_clamp(5.0);
        let mut grid = DepthGrid::new(672, 376);
        cam.grab(SensingMode::Fill).unwrap();
        cam.retrieve_measure(Measure::Depth, &mut grid).unwrap();

        // Top row of the ground plane is ~25 m away
        assert_eq!(grid.get(0, 0), Some(f32::INFINITY));
        assert!(grid
            .as_slice()
            .iter()
            .filter(|v| v.is_finite())
            .all(|v| *v <= 5.0));
    }

    #[test]
    fn test_frames_differ() {
        let mut cam = camera();
        let mut a = DepthGrid::new(672, 376);
        let mut b = DepthGrid::new(672, 376);
        cam.grab(SensingMode::Fill).unwrap();
        cam.retrieve_measure(Measure::Depth, &mut a).unwrap();
        cam.grab(SensingMode::Fill).unwrap();
        cam.retrieve_measure(Measure::Depth, &mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_injected_capture_failures() {
        let mut cam = camera().with_capture_failures(3);
        assert!(cam.grab(SensingMode::Fill).is_ok());
        assert!(cam.grab(SensingMode::Fill).is_ok());
        assert!(matches!(
            cam.grab(SensingMode::Fill),
            Err(DeviceError::CaptureFailed(_))
        ));
        assert_eq!(cam.frames_grabbed(), 3);
    }
}
