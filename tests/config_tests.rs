// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use depthpub::backends::camera::{DepthMode, DepthUnit, ResolutionPreset};
use depthpub::constants::MAX_QUEUE_SIZE;
use depthpub::{CaptureErrorPolicy, Config, SensingMode};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.camera.resolution, ResolutionPreset::Vga);
    assert_eq!(config.camera.depth_mode, DepthMode::Performance);
    assert_eq!(config.camera.unit, DepthUnit::Meter);
    assert_eq!(config.camera.depth_clamp, 15.0);
    assert_eq!(config.sensing_mode, SensingMode::Fill);
    assert_eq!(config.topic, "quad/depth");
    assert_eq!(config.queue_size, 1000);
}

#[test]
fn test_config_unthrottled_by_default() {
    // Pacing is an explicit opt-in
    let config = Config::default();
    assert_eq!(config.max_rate_hz, None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_skips_failed_frames_by_default() {
    assert_eq!(Config::default().on_capture_error, CaptureErrorPolicy::Skip);
}

#[test]
fn test_config_rejects_empty_queue() {
    let config = Config {
        queue_size: 0,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_queue_size_upper_bound() {
    let at_limit = Config {
        queue_size: MAX_QUEUE_SIZE,
        ..Config::default()
    };
    assert!(at_limit.validate().is_ok());

    for queue_size in [MAX_QUEUE_SIZE + 1, usize::MAX] {
        let config = Config {
            queue_size,
            ..Config::default()
        };
        assert!(config.validate().is_err(), "{} should be rejected", queue_size);
    }
}

#[test]
fn test_config_rejects_blank_topic() {
    let config = Config {
        topic: "  ".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_json_roundtrip() {
    let config = Config {
        max_rate_hz: Some(10.0),
        ..Config::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[cfg(not(feature = "v4l2"))]
#[test]
fn test_default_config_opens_without_hardware_support() {
    use depthpub::backends::camera::{CameraBackendType, open_camera};

    // Without V4L2 compiled in, the defaults must still yield a working camera
    let config = Config::default();
    assert_eq!(config.backend, CameraBackendType::Simulated);

    let camera = open_camera(config.backend, &config.camera).unwrap();
    assert_eq!(camera.resolution(), ResolutionPreset::Vga.dimensions());
}
