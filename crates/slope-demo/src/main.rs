//! Headless ride generation demo.
//!
//! Loads the session config, generates chunks on the background ride worker,
//! logs per-chunk statistics and optionally writes a PNG surface map.

mod surface_map;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use slope_config::{CliArgs, Config, ConfigError};
use slope_terrain::{GeneratedChunk, ObstacleKind, RideSession, RideWorker, TreeSize, WorkerError};
use tracing::{info, warn};

/// Chunks generated when `--chunks` is not given.
const DEFAULT_CHUNKS: u32 = 8;

/// How long to wait for a single chunk before giving up.
const CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("timed out waiting for chunk {0}")]
    Timeout(u32),
    #[error("failed to write surface map: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode surface map: {0}")]
    Png(#[from] png::EncodingError),
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slope")
    });

    // Load or create config, then apply CLI overrides
    let loaded = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    let config = match resolve_config(loaded, &args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let log_dir = config_dir.join("logs");
    slope_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let chunks = args.chunks.unwrap_or(DEFAULT_CHUNKS);
    if let Err(e) = run(&config, chunks) {
        tracing::error!("Ride generation failed: {e}");
        std::process::exit(1);
    }
}

/// Apply CLI overrides and validate.
///
/// A loaded file that fails validation is replaced by the defaults, with the
/// CLI overrides applied again on top. Invalid overrides are an error.
fn resolve_config(mut loaded: Config, args: &CliArgs) -> Result<Config, ConfigError> {
    loaded.apply_cli_overrides(args);
    match loaded.validate() {
        Ok(()) => Ok(loaded),
        Err(e) => {
            eprintln!("{e}, using defaults with command-line overrides");
            let mut config = Config::default();
            config.apply_cli_overrides(args);
            config.validate()?;
            Ok(config)
        }
    }
}

fn run(config: &Config, chunks: u32) -> Result<(), DemoError> {
    info!(
        "Generating {} chunks (seed={}, {} segments/chunk)",
        chunks, config.ride.seed, config.ride.segments_per_chunk
    );

    let start = Instant::now();
    let generated = generate_chunks(config, chunks)?;
    let total_placements: usize = generated.iter().map(|c| c.placements.len()).sum();
    let total_jumps: usize = generated.iter().map(|c| c.jumps.len()).sum();
    info!(
        "Generated {} chunks in {:.1}ms: {} placements, {} jump overlaps",
        generated.len(),
        start.elapsed().as_secs_f64() * 1000.0,
        total_placements,
        total_jumps,
    );

    if config.debug.write_surface_map {
        let path = Path::new(&config.debug.surface_map_path);
        write_surface_map(config, &generated, path)?;
    }
    Ok(())
}

/// Pull `chunks` chunks through the background worker.
fn generate_chunks(config: &Config, chunks: u32) -> Result<Vec<GeneratedChunk>, DemoError> {
    let capacity = chunks.max(1) as usize;
    let worker = RideWorker::new(config.ride_config(), capacity, capacity)?;
    for _ in 0..chunks {
        worker.submit()?;
    }

    let mut generated = Vec::with_capacity(capacity);
    for expected in 0..chunks {
        let deadline = Instant::now() + CHUNK_TIMEOUT;
        let done = loop {
            if let Some(done) = worker.recv_timeout(Duration::from_millis(100))? {
                break done;
            }
            if Instant::now() > deadline {
                return Err(DemoError::Timeout(expected));
            }
        };
        log_chunk(&done.chunk);
        generated.push(done.chunk);
    }
    Ok(generated)
}

fn kind_label(kind: ObstacleKind) -> &'static str {
    match kind {
        ObstacleKind::Tree(TreeSize::Small) => "small_tree",
        ObstacleKind::Tree(TreeSize::Medium) => "medium_tree",
        ObstacleKind::Tree(TreeSize::Large) => "large_tree",
        ObstacleKind::DeadTree => "dead_tree",
        ObstacleKind::Rock => "rock",
    }
}

fn log_chunk(chunk: &GeneratedChunk) {
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for placement in &chunk.placements {
        *by_kind.entry(kind_label(placement.kind)).or_insert(0) += 1;
    }
    let (s0, s1) = chunk.arc_range().unwrap_or_default();
    let altitude = chunk.points.first().map_or(0.0, |p| p.position.y);
    info!(
        "Chunk {}: s=[{:.0}, {:.0}], altitude={:.1}, slope={:.3}, jumps={}, obstacles={:?}, {}us",
        chunk.index,
        s0,
        s1,
        altitude,
        chunk.slope_tangent,
        chunk.jumps.len(),
        by_kind,
        chunk.generation_time_us,
    );
}

/// Replay the ride locally and render the sampled corridor of every chunk.
///
/// The session is deterministic, so the replay reproduces the worker's chunks.
fn write_surface_map(
    config: &Config,
    generated: &[GeneratedChunk],
    path: &Path,
) -> Result<(), DemoError> {
    let columns = config.debug.surface_map_columns as usize;
    let mut session = RideSession::new(config.ride_config());
    let mut samples = Vec::new();
    for chunk in generated {
        let replay = session.generate_next_chunk();
        if replay.points != chunk.points {
            warn!("Replayed chunk {} differs from the worker's", chunk.index);
        }
        samples.extend(session.sample_grid(&replay, columns));
    }

    let shares: Vec<String> = slope_terrain::debug_viz::surface_histogram(&samples)
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect();
    info!("Surface map cells: {}", shares.join(", "));

    let rows = samples.len() / columns.max(1);
    let image = slope_terrain::debug_viz::render_surface_map(&samples, columns as u32, rows as u32);
    surface_map::write_png(&image, path)?;
    info!(
        "Wrote {}x{} surface map to {}",
        image.width,
        image.height,
        path.display()
    );
    Ok(())
}
