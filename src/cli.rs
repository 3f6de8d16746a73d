// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running the depth publisher
//! - Listing available depth cameras
//! - Printing the effective configuration

use depthpub::Config;
use depthpub::backends::camera::{enumerate_cameras, open_camera};
use depthpub::errors::{AppError, EXIT_OK, EXIT_RUNTIME};
use depthpub::pipeline::{StopSignal, launch};
use depthpub::transport::TcpTopicServer;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Publish depth frames until interrupted
///
/// Exit status is 0 on normal shutdown, 1 when the camera cannot be
/// initialized and 2 for any other fatal error.
pub fn run_publisher(config: Config) -> ExitCode {
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::from(e.exit_code());
    }

    let stop = StopSignal::new();
    if let Err(e) = stop.install_ctrlc_handler() {
        warn!(error = %e, "Could not install signal handler, Ctrl+C will kill the process");
    }

    let server = match TcpTopicServer::bind(&config.bind_addr, &config.topic, config.queue_size) {
        Ok(server) => server,
        Err(e) => {
            let e = AppError::from(e);
            error!(error = %e, "Could not start topic server");
            return ExitCode::from(e.exit_code());
        }
    };

    let backend = config.backend;
    let result = launch(
        config,
        |camera| open_camera(backend, camera),
        Box::new(server),
        &stop,
    );

    match result {
        Ok(stats) => {
            info!(published = stats.frames_published, "Depth publisher stopped");
            ExitCode::from(EXIT_OK)
        }
        Err(e) => {
            error!(error = %e, "Depth publisher failed");
            ExitCode::from(e.exit_code())
        }
    }
}

/// List all available depth cameras
pub fn list_cameras() -> ExitCode {
    let cameras = enumerate_cameras();

    println!("Available depth cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}  Driver: {}", camera.path, camera.driver);
    }
    if cfg!(not(feature = "v4l2")) {
        println!();
        println!("V4L2 depth nodes are not listed: built without the v4l2 feature.");
    }

    ExitCode::from(EXIT_OK)
}

/// Print the configuration the publisher would run with
pub fn print_config(config: &Config) -> ExitCode {
    match serde_json::to_string_pretty(config) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::from(EXIT_OK)
        }
        Err(e) => {
            error!(error = %e, "Could not serialize configuration");
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}
