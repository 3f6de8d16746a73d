// SPDX-License-Identifier: GPL-3.0-only

//! Grayscale depth previews written to disk

use crate::backends::camera::DepthGrid;
use crate::backends::camera::format_converters::normalize_depth;
use crate::constants::PREVIEW_LATEST_FILENAME;
use crate::errors::{AppError, AppResult};
use image::GrayImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes every Nth frame as a normalized 8-bit PNG
pub struct PreviewWriter {
    dir: PathBuf,
    every: u32,
    written: u64,
}

impl PreviewWriter {
    /// Create the output directory and a writer for every `every`th frame
    pub fn new(dir: &Path, every: u32) -> AppResult<Self> {
        if every == 0 {
            return Err(AppError::Config(
                "preview interval must be at least 1".into(),
            ));
        }
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            every,
            written: 0,
        })
    }

    /// Previews written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write a preview if `seq` falls on the interval
    ///
    /// Returns the path of the numbered image when one was written.
    pub fn maybe_write(&mut self, seq: u64, grid: &DepthGrid) -> AppResult<Option<PathBuf>> {
        if seq % self.every as u64 != 0 {
            return Ok(None);
        }

        let image = GrayImage::from_raw(grid.width(), grid.height(), normalize_depth(grid))
            .ok_or_else(|| AppError::Preview("grid size does not match image size".into()))?;

        let path = self.dir.join(format!("depth_{:06}.png", seq));
        image.save(&path)?;
        fs::copy(&path, self.dir.join(PREVIEW_LATEST_FILENAME))?;
        self.written += 1;

        debug!(path = %path.display(), "Depth preview written");
        Ok(Some(path))
    }
}
