// SPDX-License-Identifier: GPL-3.0-only

//! Depth value conversion utilities shared by the camera backends
//!
//! Raw sensor data is turned into a [`DepthGrid`] here, then post-processed
//! according to the sensing mode and clamp distance. The normalized 8-bit
//! rendering used for previews also lives here.

use super::types::{DepthGrid, DepthUnit, SensingMode};
use crate::errors::{DeviceError, DeviceResult};

/// Convert Z16 (little-endian 16-bit millimetre) depth into the grid
///
/// A raw value of zero means "no depth" and becomes NaN.
pub fn z16_to_depth(raw: &[u8], grid: &mut DepthGrid, unit: DepthUnit) -> DeviceResult<()> {
    let expected = grid.len() * 2;
    if raw.len() < expected {
        return Err(DeviceError::RetrieveFailed(format!(
            "Z16 buffer too short: got {} bytes, expected {}",
            raw.len(),
            expected
        )));
    }

    let scale = unit.from_meters(0.001);
    for (value, chunk) in grid.as_mut_slice().iter_mut().zip(raw.chunks_exact(2)) {
        let mm = u16::from_le_bytes([chunk[0], chunk[1]]);
        *value = if mm == 0 {
            f32::NAN
        } else {
            mm as f32 * scale
        };
    }

    Ok(())
}

/// Apply the sensing mode and clamp distance to freshly retrieved depth
pub fn postprocess_depth(grid: &mut DepthGrid, mode: SensingMode, clamp: f32) {
    if mode == SensingMode::Fill {
        fill_invalid(grid);
    }
    apply_clamp(grid, clamp);
}

/// Replace NaN pixels by interpolating from valid neighbours
///
/// Gaps inside a row are linearly interpolated, gaps at the row ends copy the
/// nearest valid pixel. Rows without any valid pixel copy the nearest row that
/// had one. A frame with no valid pixel at all is reported as "too far".
pub fn fill_invalid(grid: &mut DepthGrid) {
    let width = grid.width() as usize;
    let height = grid.height() as usize;
    if width == 0 || height == 0 {
        return;
    }

    let row_valid: Vec<bool> = grid.rows_mut().map(fill_row).collect();

    if !row_valid.iter().any(|valid| *valid) {
        grid.as_mut_slice().fill(f32::INFINITY);
        return;
    }

    let data = grid.as_mut_slice();
    for row in 0..height {
        if row_valid[row] {
            continue;
        }
        if let Some(source) = nearest_valid_row(&row_valid, row) {
            data.copy_within(source * width..(source + 1) * width, row * width);
        }
    }
}

/// Fill one row in place, returning false when it had no valid pixel
fn fill_row(row: &mut [f32]) -> bool {
    let mut prev: Option<usize> = None;

    for i in 0..row.len() {
        if !row[i].is_finite() {
            continue;
        }
        match prev {
            None => {
                let v = row[i];
                row[..i].fill(v);
            }
            Some(p) if i > p + 1 => {
                let (a, b) = (row[p], row[i]);
                let span = (i - p) as f32;
                for k in p + 1..i {
                    let t = (k - p) as f32 / span;
                    row[k] = a + (b - a) * t;
                }
            }
            Some(_) => {}
        }
        prev = Some(i);
    }

    match prev {
        Some(p) => {
            let v = row[p];
            row[p + 1..].fill(v);
            true
        }
        None => false,
    }
}

fn nearest_valid_row(row_valid: &[bool], row: usize) -> Option<usize> {
    (1..row_valid.len()).find_map(|d| {
        if row >= d && row_valid[row - d] {
            Some(row - d)
        } else if row + d < row_valid.len() && row_valid[row + d] {
            Some(row + d)
        } else {
            None
        }
    })
}

/// Mark every depth farther than `clamp` as too far (+inf)
pub fn apply_clamp(grid: &mut DepthGrid, clamp: f32) {
    for value in grid.as_mut_slice() {
        if value.is_finite() && *value > clamp {
            *value = f32::INFINITY;
        }
    }
}

/// Render depth as 8-bit grayscale, near = bright
///
/// Finite values are stretched over the frame's own min..max range.
/// NaN and infinite values render black.
pub fn normalize_depth(grid: &DepthGrid) -> Vec<u8> {
    let (min, max) = grid
        .as_slice()
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if min > max {
        return vec![0; grid.len()];
    }

    let range = max - min;
    grid.as_slice()
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                0
            } else if range <= f32::EPSILON {
                255
            } else {
                let t = (v - min) / range;
                (255.0 - t * 255.0).round().clamp(0.0, 255.0) as u8
            }
        })
        .collect()
}
