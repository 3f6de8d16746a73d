// SPDX-License-Identifier: GPL-3.0-only

//! depthpub - stereo depth frames onto a message topic
//!
//! Reads depth frames from a stereo depth camera and republishes each frame's
//! depth values as a flat, row-major `f32` array on a named topic, for
//! consumers such as a flight controller.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Depth camera abstraction and its V4L2 and simulated backends
//! - [`transport`]: Depth array message, in-process topic bus and TCP topic server
//! - [`pipeline`]: The acquisition-and-publish loop, pacing and previews
//! - [`config`]: Startup configuration
//! - [`errors`]: Error types and process exit codes
//!
//! # Example
//!
//! ```ignore
//! use depthpub::backends::camera::{CameraBackendType, open_camera};
//! use depthpub::pipeline::{StopSignal, launch};
//! use depthpub::transport::TopicBus;
//!
//! let config = depthpub::Config::default();
//! let bus = TopicBus::new(&config.topic, config.queue_size);
//! let stop = StopSignal::new();
//! let stats = launch(
//!     config,
//!     |camera| open_camera(CameraBackendType::Simulated, camera),
//!     Box::new(bus),
//!     &stop,
//! )?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipeline;
pub mod transport;

// Re-export commonly used types
pub use backends::camera::{DepthCamera, DepthGrid, SensingMode};
pub use config::{CaptureErrorPolicy, Config};
pub use errors::{AppError, AppResult};
pub use pipeline::{LoopStats, PublisherContext, StopSignal};
pub use transport::{DepthArray, Publisher};
