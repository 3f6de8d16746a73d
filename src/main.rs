// SPDX-License-Identifier: GPL-3.0-only

use clap::{Args, Parser, Subcommand};
use depthpub::backends::camera::{CameraBackendType, DepthMode, DepthUnit, ResolutionPreset};
use depthpub::{CaptureErrorPolicy, Config, SensingMode};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser)]
#[command(name = "depthpub")]
#[command(about = "Publish stereo depth camera frames on a message topic")]
#[command(version = depthpub::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the publisher (default)
    Run,

    /// List available depth cameras
    List,

    /// Print the effective configuration as JSON
    Config,
}

/// Overrides applied on top of the compiled-in defaults
#[derive(Args)]
struct RunArgs {
    /// Camera backend
    #[arg(long, value_enum)]
    backend: Option<CameraBackendType>,

    /// Device node to open
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Resolution preset
    #[arg(short, long, value_enum)]
    resolution: Option<ResolutionPreset>,

    /// Depth computation mode
    #[arg(long, value_enum)]
    depth_mode: Option<DepthMode>,

    /// Unit of published depth values
    #[arg(long, value_enum)]
    unit: Option<DepthUnit>,

    /// Maximum reported depth, in the chosen unit
    #[arg(long)]
    clamp: Option<f32>,

    /// How pixels without depth are reported
    #[arg(long, value_enum)]
    sensing: Option<SensingMode>,

    /// Topic name
    #[arg(short, long)]
    topic: Option<String>,

    /// Pending messages kept per subscriber
    #[arg(long)]
    queue_size: Option<usize>,

    /// Address the topic server listens on
    #[arg(long)]
    bind: Option<String>,

    /// Cap the loop rate (unthrottled when omitted)
    #[arg(long)]
    max_rate_hz: Option<f64>,

    /// What to do when a frame cannot be captured
    #[arg(long, value_enum)]
    on_capture_error: Option<CaptureErrorPolicy>,

    /// Directory for depth preview images
    #[arg(long)]
    preview_dir: Option<PathBuf>,

    /// Write a preview every N frames
    #[arg(long)]
    preview_every: Option<u32>,

    /// Stop after N frames
    #[arg(long)]
    frames: Option<u64>,
}

impl RunArgs {
    fn into_config(self) -> Config {
        let mut config = Config::default();

        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if self.device.is_some() {
            config.camera.device = self.device;
        }
        if let Some(resolution) = self.resolution {
            config.camera.resolution = resolution;
        }
        if let Some(depth_mode) = self.depth_mode {
            config.camera.depth_mode = depth_mode;
        }
        if let Some(unit) = self.unit {
            config.camera.unit = unit;
        }
        if let Some(clamp) = self.clamp {
            config.camera.depth_clamp = clamp;
        }
        if let Some(sensing) = self.sensing {
            config.sensing_mode = sensing;
        }
        if let Some(topic) = self.topic {
            config.topic = topic;
        }
        if let Some(queue_size) = self.queue_size {
            config.queue_size = queue_size;
        }
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if self.max_rate_hz.is_some() {
            config.max_rate_hz = self.max_rate_hz;
        }
        if let Some(policy) = self.on_capture_error {
            config.on_capture_error = policy;
        }
        if self.preview_dir.is_some() {
            config.preview_dir = self.preview_dir;
        }
        if let Some(every) = self.preview_every {
            config.preview_every = every;
        }
        if self.frames.is_some() {
            config.max_frames = self.frames;
        }

        config
    }
}

fn main() -> ExitCode {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depthpub=trace, RUST_LOG=warn
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli.run.into_config();

    match cli.command {
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Config) => cli::print_config(&config),
        Some(Commands::Run) | None => cli::run_publisher(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("depthpub").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_flags_keeps_defaults() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(cli.run.into_config(), Config::default());
    }

    #[test]
    fn test_overrides_reach_config() {
        let config = parse(&[
            "--backend",
            "sim",
            "--resolution",
            "hd720",
            "--sensing",
            "standard",
            "--topic",
            "drone/depth",
            "--queue-size",
            "8",
            "--bind",
            "0.0.0.0:9000",
            "--max-rate-hz",
            "10",
            "--on-capture-error",
            "abort",
            "--preview-every",
            "5",
            "--frames",
            "42",
            "--clamp",
            "7.5",
            "--depth-mode",
            "quality",
            "--unit",
            "millimeter",
        ])
        .run
        .into_config();

        assert_eq!(config.backend, CameraBackendType::Simulated);
        assert_eq!(config.camera.resolution, ResolutionPreset::Hd720);
        assert_eq!(config.camera.depth_clamp, 7.5);
        assert_eq!(config.camera.depth_mode, DepthMode::Quality);
        assert_eq!(config.camera.unit, DepthUnit::Millimeter);
        assert_eq!(config.sensing_mode, SensingMode::Standard);
        assert_eq!(config.topic, "drone/depth");
        assert_eq!(config.queue_size, 8);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.max_rate_hz, Some(10.0));
        assert_eq!(config.on_capture_error, CaptureErrorPolicy::Abort);
        assert_eq!(config.preview_every, 5);
        assert_eq!(config.max_frames, Some(42));
    }

    #[test]
    fn test_subcommand_with_flags() {
        let cli = parse(&["--frames", "3", "config"]);
        assert!(matches!(cli.command, Some(Commands::Config)));
        assert_eq!(cli.run.into_config().max_frames, Some(3));
    }
}
