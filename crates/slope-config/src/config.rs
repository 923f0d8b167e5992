//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use slope_terrain::{
    JumpParams, ObstacleParams, PathParams, RideConfig, RideParams, SurfaceRules, TerrainParams,
};

use crate::error::ConfigError;

/// Top-level session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Seed, chunk size, altitude and slope.
    pub ride: RideParams,
    /// Centerline shape.
    pub path: PathParams,
    /// Canyon cross-section.
    pub terrain: TerrainParams,
    /// Jump schedule.
    pub jumps: JumpParams,
    /// Obstacle scatter rules.
    pub obstacles: ObstacleParams,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a PNG surface map of the generated chunks.
    pub write_surface_map: bool,
    /// Output path of the surface map.
    pub surface_map_path: String,
    /// Samples across the corridor per path point (the image width).
    pub surface_map_columns: u32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            write_surface_map: false,
            surface_map_path: "surface_map.png".to_string(),
            surface_map_columns: 160,
        }
    }
}

fn ensure(ok: bool, message: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid(message()))
    }
}

fn ensure_range(name: &str, (min, max): (f64, f64)) -> Result<(), ConfigError> {
    ensure(min <= max, || format!("{name} is inverted: ({min}, {max})"))
}

fn ensure_rules(zone: &str, rules: &SurfaceRules) -> Result<(), ConfigError> {
    ensure((0.0..=1.0).contains(&rules.rarity), || {
        format!("obstacles.{zone}.rarity must be within [0, 1], got {}", rules.rarity)
    })?;
    for band in &rules.noise_bands {
        ensure(band.min <= band.max, || {
            format!("obstacles.{zone} has an inverted noise band ({}, {})", band.min, band.max)
        })?;
    }
    Ok(())
}

impl Config {
    /// Generator configuration for a [`slope_terrain::RideSession`].
    pub fn ride_config(&self) -> RideConfig {
        RideConfig {
            ride: self.ride.clone(),
            path: self.path.clone(),
            terrain: self.terrain.clone(),
            jumps: self.jumps.clone(),
            obstacles: self.obstacles.clone(),
        }
    }

    /// Reject values that would produce a degenerate ride.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ride = &self.ride;
        ensure(ride.segments_per_chunk > 0, || {
            "ride.segments_per_chunk must be positive".into()
        })?;
        ensure(ride.retained_chunks > 0, || {
            "ride.retained_chunks must be positive".into()
        })?;

        let path = &self.path;
        ensure(path.segment_length > 0.0, || {
            format!("path.segment_length must be positive, got {}", path.segment_length)
        })?;
        ensure(path.width_base > 0.0, || {
            format!("path.width_base must be positive, got {}", path.width_base)
        })?;
        ensure(path.smoothing_window > 0, || {
            "path.smoothing_window must be at least 1".into()
        })?;

        let terrain = &self.terrain;
        ensure(terrain.floor_offset >= 0.0, || {
            format!("terrain.floor_offset must not be negative, got {}", terrain.floor_offset)
        })?;
        ensure(terrain.wall_width > 0.0, || {
            format!("terrain.wall_width must be positive, got {}", terrain.wall_width)
        })?;
        ensure(terrain.terrace_count > 0, || {
            "terrain.terrace_count must be at least 1".into()
        })?;
        ensure((0.0..0.5).contains(&terrain.ledge_fraction), || {
            format!(
                "terrain.ledge_fraction must be within [0, 0.5), got {}",
                terrain.ledge_fraction
            )
        })?;
        if let Some(bank) = terrain.bank_width {
            ensure((0.0..=terrain.floor_offset).contains(&bank), || {
                format!("terrain.bank_width must be within [0, floor_offset], got {bank}")
            })?;
        }

        let jumps = &self.jumps;
        ensure(jumps.min_spacing > 0.0, || {
            format!("jumps.min_spacing must be positive, got {}", jumps.min_spacing)
        })?;
        ensure(jumps.min_spacing <= jumps.max_spacing, || {
            format!(
                "jumps.min_spacing ({}) exceeds jumps.max_spacing ({})",
                jumps.min_spacing, jumps.max_spacing
            )
        })?;
        ensure_range("jumps.length_range", jumps.length_range)?;
        ensure_range("jumps.height_range", jumps.height_range)?;
        ensure_range("jumps.band_fraction_range", jumps.band_fraction_range)?;
        ensure(jumps.length_range.0 > 0.0, || {
            "jumps.length_range must be positive".into()
        })?;

        let obstacles = &self.obstacles;
        ensure(obstacles.grid_spacing > 0.0, || {
            format!("obstacles.grid_spacing must be positive, got {}", obstacles.grid_spacing)
        })?;
        ensure_range("obstacles.rock_scale", obstacles.rock_scale)?;
        for (name, scale) in [
            ("small", &obstacles.tree_scales.small),
            ("medium", &obstacles.tree_scales.medium),
            ("large", &obstacles.tree_scales.large),
        ] {
            ensure(scale.min <= scale.max, || {
                format!("obstacles.tree_scales.{name} has min > max")
            })?;
        }
        ensure_rules("track", &obstacles.track)?;
        ensure_rules("bank", &obstacles.bank)?;
        ensure_rules("cliff", &obstacles.cliff)?;
        ensure_rules("plateau", &obstacles.plateau)?;

        ensure(self.debug.surface_map_columns > 0, || {
            "debug.surface_map_columns must be positive".into()
        })
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
