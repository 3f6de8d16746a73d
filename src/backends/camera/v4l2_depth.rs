// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 depth capture for Z16 format
//!
//! UVC depth cameras expose their depth stream as a separate video node
//! delivering 16-bit little-endian millimetre values. This backend opens that
//! node with the v4l crate, streams through memory-mapped buffers and converts
//! each frame on the CPU.

use super::DepthCamera;
use super::format_converters::{postprocess_depth, z16_to_depth};
use super::types::*;
use crate::errors::{DeviceError, DeviceResult, InitErrorCode};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Device node opened when the configuration names none
pub const DEFAULT_DEPTH_NODE: &str = "/dev/video0";

/// Memory-mapped buffers queued with the driver
const BUFFER_COUNT: u32 = 4;

fn z16_fourcc() -> v4l::FourCC {
    v4l::FourCC::new(b"Z16 ")
}

fn init_error(err: io::Error, what: &str) -> DeviceError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => InitErrorCode::NoDevice,
        io::ErrorKind::PermissionDenied => InitErrorCode::AccessDenied,
        _ => InitErrorCode::StreamFailed,
    };
    DeviceError::init(code, format!("{}: {}", what, err))
}

/// Z16 depth node opened for streaming
pub struct V4l2DepthCamera {
    device_path: String,
    width: u32,
    height: u32,
    unit: DepthUnit,
    depth_clamp: f32,
    stream: MmapStream<'static>,
    /// Keeps the device open for as long as the stream exists
    _device: Device,
    /// Copy of the last grabbed frame
    raw: Vec<u8>,
    grabbed: Option<SensingMode>,
    sequence: u32,
}

impl V4l2DepthCamera {
    /// Open and configure the depth node named in `config`
    pub fn open(config: &CameraConfig) -> DeviceResult<Self> {
        let device_path = config
            .device
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEPTH_NODE))
            .to_string_lossy()
            .to_string();
        let (req_width, req_height) = config.resolution.dimensions();

        info!(
            device_path = %device_path,
            width = req_width,
            height = req_height,
            "Opening V4L2 device for Z16 capture"
        );

        let device = Device::with_path(&device_path)
            .map_err(|e| init_error(e, &format!("failed to open {}", device_path)))?;

        let mut format = device
            .format()
            .map_err(|e| init_error(e, "failed to query format"))?;
        format.width = req_width;
        format.height = req_height;
        format.fourcc = z16_fourcc();

        let applied = device
            .set_format(&format)
            .map_err(|e| init_error(e, "failed to set format"))?;

        if applied.fourcc != z16_fourcc() {
            return Err(DeviceError::init(
                InitErrorCode::FormatRejected,
                format!("device offers {:?} instead of Z16", applied.fourcc),
            ));
        }
        if (applied.width, applied.height) != (req_width, req_height) {
            warn!(
                requested_width = req_width,
                requested_height = req_height,
                width = applied.width,
                height = applied.height,
                "Device adjusted the resolution, using the reported size"
            );
        }

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| init_error(e, "failed to create buffer stream"))?;

        info!(
            width = applied.width,
            height = applied.height,
            "V4L2 depth capture stream started"
        );

        Ok(Self {
            device_path,
            width: applied.width,
            height: applied.height,
            unit: config.unit,
            depth_clamp: config.depth_clamp,
            stream,
            _device: device,
            raw: Vec::with_capacity(applied.width as usize * applied.height as usize * 2),
            grabbed: None,
            sequence: 0,
        })
    }
}

impl DepthCamera for V4l2DepthCamera {
    fn name(&self) -> &str {
        &self.device_path
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_depth_clamp(&mut self, clamp: f32) {
        self.depth_clamp = clamp;
    }

    fn grab(&mut self, mode: SensingMode) -> DeviceResult<()> {
        self.grabbed = None;

        let (buf, meta) = self.stream.next().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => DeviceError::Disconnected,
            _ => DeviceError::CaptureFailed(e.to_string()),
        })?;

        self.raw.clear();
        self.raw.extend_from_slice(buf);
        self.sequence = meta.sequence;
        self.grabbed = Some(mode);

        if self.sequence % 60 == 0 {
            debug!(
                sequence = self.sequence,
                size = self.raw.len(),
                "Depth frame captured"
            );
        }

        Ok(())
    }

    fn retrieve_measure(&mut self, measure: Measure, grid: &mut DepthGrid) -> DeviceResult<()> {
        let Some(mode) = self.grabbed else {
            return Err(DeviceError::RetrieveFailed(
                "no frame has been grabbed".to_string(),
            ));
        };

        match measure {
            Measure::Depth => {
                z16_to_depth(&self.raw, grid, self.unit)?;
                postprocess_depth(grid, mode, self.depth_clamp);
            }
        }

        Ok(())
    }
}

impl Drop for V4l2DepthCamera {
    fn drop(&mut self) {
        info!(device_path = %self.device_path, "Closing V4L2 depth device");
    }
}

/// List V4L2 nodes that offer Z16 depth
pub fn enumerate_depth_nodes() -> Vec<CameraDevice> {
    v4l::context::enum_devices()
        .into_iter()
        .filter_map(|node| {
            let path = node.path().to_string_lossy().to_string();
            let device = Device::with_path(&path).ok()?;
            let formats = device.enum_formats().ok()?;
            if !formats.iter().any(|f| f.fourcc == z16_fourcc()) {
                return None;
            }

            let caps = device.query_caps().ok()?;
            debug!(path = %path, card = %caps.card, "Found Z16 depth node");

            Some(CameraDevice {
                name: node.name().unwrap_or(caps.card),
                path,
                driver: caps.driver,
            })
        })
        .collect()
}
