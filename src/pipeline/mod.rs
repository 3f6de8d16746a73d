// SPDX-License-Identifier: GPL-3.0-only

//! Acquisition-and-publish loop
//!
//! One thread opens the camera, then repeats until stopped:
//!
//! ```text
//! grab(sensing mode) → retrieve depth grid → flatten row-major → publish
//!        │                                                         │
//!        └──────────── optional preview, optional pacing ◄─────────┘
//! ```
//!
//! Everything the loop touches lives in a [`PublisherContext`]: the device,
//! the configuration, the publisher and the reused frame and message buffers.

pub mod frame_loop;
pub mod preview;
pub mod rate;

pub use frame_loop::{LoopAction, StopSignal};
pub use preview::PreviewWriter;
pub use rate::RateLimiter;

use crate::backends::camera::{CameraConfig, DepthCamera, DepthGrid, Measure};
use crate::config::{CaptureErrorPolicy, Config};
use crate::errors::{AppError, AppResult, DeviceError, DeviceResult};
use crate::transport::{DepthArray, Publisher};
use chrono::Utc;
use tracing::{debug, error, info, warn};

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Loop iterations started
    pub iterations: u64,
    /// Frames grabbed and retrieved successfully
    pub frames_captured: u64,
    /// Messages handed to the publisher
    pub frames_published: u64,
    /// Failed grabs or retrievals
    pub capture_errors: u64,
}

/// Owned state of the acquisition loop
pub struct PublisherContext {
    camera: Box<dyn DepthCamera>,
    publisher: Box<dyn Publisher>,
    config: Config,
    grid: DepthGrid,
    message: DepthArray,
    rate: RateLimiter,
    preview: Option<PreviewWriter>,
    next_seq: u64,
}

impl PublisherContext {
    /// Take ownership of an opened camera and a publisher
    ///
    /// Applies the configured clamp distance and sizes the frame buffers from
    /// the resolution the camera reports.
    pub fn new(
        mut camera: Box<dyn DepthCamera>,
        publisher: Box<dyn Publisher>,
        config: Config,
    ) -> AppResult<Self> {
        config.validate()?;

        camera.set_depth_clamp(config.camera.depth_clamp);
        let (width, height) = camera.resolution();
        let grid = DepthGrid::new(width, height);
        let message = DepthArray::with_capacity(grid.len());
        let rate = RateLimiter::new(config.max_rate_hz)?;

        let preview = match config.preview_directory() {
            Some(dir) => Some(PreviewWriter::new(&dir, config.preview_every)?),
            None => None,
        };

        info!(
            camera = camera.name(),
            width,
            height,
            topic = publisher.topic(),
            clamp = config.camera.depth_clamp,
            max_rate_hz = ?config.max_rate_hz,
            "Depth publisher ready"
        );

        Ok(Self {
            camera,
            publisher,
            config,
            grid,
            message,
            rate,
            preview,
            next_seq: 1,
        })
    }

    /// Last retrieved depth grid
    pub fn grid(&self) -> &DepthGrid {
        &self.grid
    }

    /// Grab a frame and retrieve its depth into the frame buffer
    fn capture(&mut self) -> DeviceResult<()> {
        self.camera.grab(self.config.sensing_mode)?;
        self.camera.retrieve_measure(Measure::Depth, &mut self.grid)
    }

    /// Flatten the frame buffer into the message and publish it
    fn publish_current(&mut self) -> AppResult<u64> {
        let seq = self.next_seq;
        self.message.fill_from_grid(&self.grid, seq, Utc::now());
        self.publisher.publish(&self.message)?;
        self.next_seq += 1;
        Ok(seq)
    }

    fn write_preview(&mut self, seq: u64) {
        if let Some(preview) = self.preview.as_mut()
            && let Err(e) = preview.maybe_write(seq, &self.grid)
        {
            warn!(error = %e, "Failed to write depth preview");
        }
    }

    /// Run one iteration: capture, publish, preview
    ///
    /// Pacing is left to the caller.
    pub fn step(&mut self, stats: &mut LoopStats) -> AppResult<LoopAction> {
        stats.iterations += 1;

        if let Err(e) = self.capture() {
            stats.capture_errors += 1;
            // A vanished device never recovers, whatever the policy
            if matches!(e, DeviceError::Disconnected) {
                error!(iteration = stats.iterations, "Camera disconnected, stopping");
                return Err(e.into());
            }
            return match self.config.on_capture_error {
                CaptureErrorPolicy::Skip => {
                    warn!(error = %e, iteration = stats.iterations, "Capture failed, skipping frame");
                    Ok(LoopAction::Continue)
                }
                CaptureErrorPolicy::Abort => {
                    error!(error = %e, iteration = stats.iterations, "Capture failed, aborting");
                    Err(e.into())
                }
            };
        }
        stats.frames_captured += 1;

        let seq = self.publish_current()?;
        stats.frames_published += 1;

        if seq % 100 == 0 {
            debug!(seq, values = self.message.data.len(), "Published depth frame");
        }

        self.write_preview(seq);

        match self.config.max_frames {
            Some(max) if stats.iterations >= max => Ok(LoopAction::Stop),
            _ => Ok(LoopAction::Continue),
        }
    }
}

/// Run the loop until `stop` is requested, `max_frames` is reached, the
/// camera disconnects, or a capture fails under [`CaptureErrorPolicy::Abort`]
///
/// The stop signal is only observed between iterations, so an iteration that
/// has already captured a frame still publishes it.
pub fn run_loop(ctx: &mut PublisherContext, stop: &StopSignal) -> AppResult<LoopStats> {
    let mut stats = LoopStats::default();
    ctx.rate.reset();

    while !stop.is_stop_requested() {
        if let Some(max) = ctx.config.max_frames
            && stats.iterations >= max
        {
            break;
        }

        match ctx.step(&mut stats)? {
            LoopAction::Continue => {}
            LoopAction::Stop => break,
        }

        ctx.rate.sleep();
    }

    info!(
        iterations = stats.iterations,
        captured = stats.frames_captured,
        published = stats.frames_published,
        capture_errors = stats.capture_errors,
        "Acquisition loop finished"
    );
    Ok(stats)
}

/// Open the camera, run the loop, and release the camera
///
/// An initialization failure is returned before anything is published. The
/// camera is dropped exactly once, when this function returns.
pub fn launch<F>(
    config: Config,
    open: F,
    publisher: Box<dyn Publisher>,
    stop: &StopSignal,
) -> AppResult<LoopStats>
where
    F: FnOnce(&CameraConfig) -> DeviceResult<Box<dyn DepthCamera>>,
{
    config.validate()?;

    let camera = match open(&config.camera) {
        Ok(camera) => camera,
        Err(e) => {
            if let DeviceError::InitFailed { code, .. } = &e {
                error!(code = %code, error = %e, "Camera initialization failed");
            }
            return Err(AppError::Device(e));
        }
    };

    let mut ctx = PublisherContext::new(camera, publisher, config)?;
    run_loop(&mut ctx, stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SimulatedCamera;
    use crate::transport::TopicBus;
    use std::thread;
    use std::time::Duration;

    fn sim_context(config: Config, bus: &TopicBus) -> PublisherContext {
        let camera = SimulatedCamera::open(&config.camera).unwrap();
        PublisherContext::new(Box::new(camera), Box::new(bus.clone()), config).unwrap()
    }

    #[test]
    fn test_step_publishes_one_frame() {
        let bus = TopicBus::new("quad/depth", 4);
        let mut sub = bus.subscribe();
        let mut ctx = sim_context(Config::default(), &bus);
        let mut stats = LoopStats::default();

        assert_eq!(ctx.step(&mut stats).unwrap(), LoopAction::Continue);
        let msg = sub.try_recv().unwrap().unwrap();
        assert_eq!(msg.seq, 1);
        assert_eq!(msg.data.len(), 672 * 376);
        assert_eq!(msg.data.as_slice(), ctx.grid().as_slice());
    }

    #[test]
    fn test_max_frames_stops_loop() {
        let bus = TopicBus::new("quad/depth", 16);
        let config = Config {
            max_frames: Some(3),
            ..Config::default()
        };
        let mut ctx = sim_context(config, &bus);

        let stats = run_loop(&mut ctx, &StopSignal::new()).unwrap();
        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.frames_published, 3);
        assert_eq!(bus.published(), 3);
    }

    #[test]
    fn test_stop_from_another_thread_ends_loop() {
        let bus = TopicBus::new("quad/depth", 4);
        let mut ctx = sim_context(Config::default(), &bus);
        let stop = StopSignal::new();

        let remote = stop.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.request_stop();
        });

        // Unbounded run; only the stop request can end it
        let stats = run_loop(&mut ctx, &stop).unwrap();
        stopper.join().unwrap();
        assert!(stats.frames_published > 0);
        assert_eq!(stats.frames_published, bus.published());
    }

    #[test]
    fn test_stop_before_start_runs_nothing() {
        let bus = TopicBus::new("quad/depth", 4);
        let mut ctx = sim_context(Config::default(), &bus);
        let stop = StopSignal::new();
        stop.request_stop();

        let stats = run_loop(&mut ctx, &stop).unwrap();
        assert_eq!(stats, LoopStats::default());
    }
}
