//! Command-line argument parsing for the slope generator.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Slope generator command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "slope", about = "Endless ski-run generator")]
pub struct CliArgs {
    /// Ride seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of chunks to generate.
    #[arg(long)]
    pub chunks: Option<u32>,

    /// Path points per chunk.
    #[arg(long)]
    pub segments: Option<usize>,

    /// Obstacle scan grid spacing.
    #[arg(long)]
    pub grid_spacing: Option<f64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write a PNG surface map of the generated chunks to this path.
    #[arg(long, value_name = "PNG")]
    pub surface_map: Option<PathBuf>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    ///
    /// `--chunks` is not part of the persisted config; the host reads it from
    /// the arguments directly.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.ride.seed = seed;
        }
        if let Some(segments) = args.segments {
            self.ride.segments_per_chunk = segments;
        }
        if let Some(spacing) = args.grid_spacing {
            self.obstacles.grid_spacing = spacing;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref path) = args.surface_map {
            self.debug.write_surface_map = true;
            self.debug.surface_map_path = path.display().to_string();
        }
    }
}
