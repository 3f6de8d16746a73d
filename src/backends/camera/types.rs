// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for depth camera backends

use crate::constants::{DEFAULT_DEPTH_CLAMP, resolution};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum CameraBackendType {
    /// Depth node exposed through V4L2 (Z16 pixel format)
    V4l2,
    /// Deterministic synthetic stereo camera
    #[value(name = "sim")]
    Simulated,
}

impl Default for CameraBackendType {
    /// Real hardware when V4L2 support is compiled in, simulation otherwise
    fn default() -> Self {
        if cfg!(feature = "v4l2") {
            CameraBackendType::V4l2
        } else {
            CameraBackendType::Simulated
        }
    }
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Simulated => write!(f, "Simulated"),
        }
    }
}

/// Sensor resolution preset
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum ResolutionPreset {
    Hd2k,
    Hd1080,
    Hd720,
    #[default]
    Vga,
}

impl ResolutionPreset {
    /// Get all presets, largest first
    pub const ALL: [ResolutionPreset; 4] = [
        ResolutionPreset::Hd2k,
        ResolutionPreset::Hd1080,
        ResolutionPreset::Hd720,
        ResolutionPreset::Vga,
    ];

    /// Width and height in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ResolutionPreset::Hd2k => resolution::HD2K,
            ResolutionPreset::Hd1080 => resolution::HD1080,
            ResolutionPreset::Hd720 => resolution::HD720,
            ResolutionPreset::Vga => resolution::VGA,
        }
    }

    /// Number of depth values in one frame at this preset
    pub fn pixel_count(&self) -> usize {
        let (w, h) = self.dimensions();
        w as usize * h as usize
    }
}

/// Depth computation quality/speed trade-off
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum DepthMode {
    /// Fastest depth, coarser detail
    #[default]
    Performance,
    /// Balanced
    Quality,
    /// Finest detail, highest cost
    Ultra,
}

/// Unit depth values are reported in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum DepthUnit {
    Millimeter,
    Centimeter,
    #[default]
    Meter,
    Inch,
    Foot,
}

impl DepthUnit {
    /// Multiplier converting meters into this unit
    pub fn per_meter(&self) -> f32 {
        match self {
            DepthUnit::Millimeter => 1000.0,
            DepthUnit::Centimeter => 100.0,
            DepthUnit::Meter => 1.0,
            DepthUnit::Inch => 39.370_08,
            DepthUnit::Foot => 3.280_84,
        }
    }

    /// Convert a distance in meters into this unit
    pub fn from_meters(&self, meters: f32) -> f32 {
        meters * self.per_meter()
    }
}

/// How pixels without a valid stereo match are reported
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum SensingMode {
    /// Interpolate occluded or invalid pixels from their neighbours
    #[default]
    Fill,
    /// Leave invalid pixels as NaN
    Standard,
}

/// Measurement kinds a camera can produce for a grabbed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Measure {
    /// Distance from the camera per pixel, in the configured unit
    Depth,
}

/// Camera open parameters, fixed for the lifetime of the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Requested resolution preset
    pub resolution: ResolutionPreset,
    /// Depth computation mode
    pub depth_mode: DepthMode,
    /// Unit of every depth value the camera reports
    pub unit: DepthUnit,
    /// Maximum reported depth in `unit`; farther points become +inf
    pub depth_clamp: f32,
    /// Device node to open (backend default when unset)
    pub device: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: ResolutionPreset::default(),
            depth_mode: DepthMode::default(),
            unit: DepthUnit::default(),
            depth_clamp: DEFAULT_DEPTH_CLAMP,
            device: None,
        }
    }
}

/// A camera found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human readable name
    pub name: String,
    /// Path used to open the device
    pub path: String,
    /// Kernel driver or backend that exposes it
    pub driver: String,
}

/// Per-pixel depth values of one frame, stored row-major
///
/// The dimensions are set when the grid is created and never change; every
/// retrieval overwrites the values in place.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthGrid {
    /// Allocate a grid filled with NaN
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![f32::NAN; width as usize * height as usize],
        }
    }

    /// Build a grid from row-major values
    ///
    /// Returns `None` when the value count does not match the dimensions.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of values in the grid
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at `row`, `col`
    pub fn get(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }

    /// One row of values, left to right
    pub fn row(&self, row: u32) -> Option<&[f32]> {
        if row >= self.height {
            return None;
        }
        let w = self.width as usize;
        let start = row as usize * w;
        self.data.get(start..start + w)
    }

    /// Iterate over rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact(0) panics, an empty grid simply has no rows
        self.data.chunks_exact(self.width.max(1) as usize)
    }

    /// Iterate mutably over rows from top to bottom
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.data.chunks_exact_mut(self.width.max(1) as usize)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}
