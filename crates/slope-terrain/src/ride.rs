//! Ride session: chunk-by-chunk generation of an endless run.
//!
//! A [`RideSession`] owns every stateful piece of one ride (spine generator,
//! terrain sampler with its jump schedule, obstacle planner) and pulls the
//! ride forward one chunk at a time. Only finished [`GeneratedChunk`] values
//! leave the session.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::jumps::{JumpParams, JumpRamp, JumpScheduler};
use crate::noise_source::{NoiseSource, SimplexNoise};
use crate::obstacles::{ObstacleParams, ObstaclePlacement, ObstaclePlanner};
use crate::path::{PathParams, PathPoint, PathSpineGenerator, TailContext};
use crate::sampler::{TerrainParams, TerrainSample, TerrainSampler};
use crate::seed::{SeedStream, chunk_rng};

/// Row of the path noise field the slope variation reads from.
const SLOPE_NOISE_ROW: f64 = -113.7;

/// Session-level ride parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RideParams {
    /// Ride seed; every noise channel and RNG stream derives from it.
    pub seed: u64,
    /// Path points per chunk.
    pub segments_per_chunk: usize,
    /// Altitude of the very first path point.
    pub start_altitude: f64,
    /// Mean descent per unit of travel.
    pub base_slope: f64,
    /// Maximum deviation of a chunk's slope from `base_slope`.
    pub slope_variation: f64,
    /// Frequency of the slope variation per chunk.
    pub slope_noise_scale: f64,
    /// Points carried into the next chunk for smoothing continuity.
    pub tail_len: usize,
    /// Chunks kept in the sampling window.
    pub retained_chunks: usize,
}

impl Default for RideParams {
    fn default() -> Self {
        Self {
            seed: 42,
            segments_per_chunk: 64,
            start_altitude: 1000.0,
            base_slope: 0.15,
            slope_variation: 0.05,
            slope_noise_scale: 0.35,
            tail_len: 8,
            retained_chunks: 3,
        }
    }
}

/// Everything a [`RideSession`] is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideConfig {
    pub ride: RideParams,
    pub path: PathParams,
    pub terrain: TerrainParams,
    pub jumps: JumpParams,
    pub obstacles: ObstacleParams,
}

/// One finished chunk of the ride.
#[derive(Clone, Debug)]
pub struct GeneratedChunk {
    /// Chunk ordinal, starting at 0.
    pub index: u64,
    /// The chunk's path points.
    pub points: Vec<PathPoint>,
    /// Jump ramps overlapping the chunk's arc-length range.
    pub jumps: Vec<JumpRamp>,
    /// Obstacles planned over the chunk.
    pub placements: Vec<ObstaclePlacement>,
    /// Descent per unit of travel used for this chunk.
    pub slope_tangent: f64,
    /// Generation time in microseconds (for profiling).
    pub generation_time_us: u64,
}

impl GeneratedChunk {
    /// Arc-length range `(first, last)` covered by the chunk's points.
    pub fn arc_range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.s, self.points.last()?.s))
    }
}

/// Generation state of a single ride.
pub struct RideSession {
    params: RideParams,
    spine: PathSpineGenerator<SimplexNoise>,
    slope_noise: SimplexNoise,
    sampler: TerrainSampler<SimplexNoise>,
    scatter: SimplexNoise,
    planner: ObstaclePlanner,
    next_chunk: u64,
    altitude: f64,
    tail: TailContext,
    window: Vec<PathPoint>,
    window_chunks: VecDeque<usize>,
}

impl RideSession {
    /// Create a session positioned before chunk 0.
    pub fn new(config: RideConfig) -> Self {
        let seed = config.ride.seed;
        let path_noise = SimplexNoise::for_stream(seed, SeedStream::Path);
        Self {
            spine: PathSpineGenerator::new(config.path, path_noise.clone()),
            slope_noise: path_noise,
            sampler: TerrainSampler::new(
                config.terrain,
                SimplexNoise::for_stream(seed, SeedStream::Terrain),
                JumpScheduler::new(config.jumps, seed),
            ),
            scatter: SimplexNoise::for_stream(seed, SeedStream::Scatter),
            planner: ObstaclePlanner::new(config.obstacles),
            next_chunk: 0,
            altitude: config.ride.start_altitude,
            tail: TailContext::empty(),
            window: Vec::new(),
            window_chunks: VecDeque::new(),
            params: config.ride,
        }
    }

    /// Return a reference to the ride parameters.
    pub fn params(&self) -> &RideParams {
        &self.params
    }

    /// Index of the chunk the next call to [`generate_next_chunk`](Self::generate_next_chunk) produces.
    pub fn next_chunk_index(&self) -> u64 {
        self.next_chunk
    }

    /// Altitude at which the next chunk starts.
    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// Path points currently retained for sampling, oldest first.
    pub fn window(&self) -> &[PathPoint] {
        &self.window
    }

    /// The jump schedule generated so far.
    pub fn jumps(&self) -> &JumpScheduler {
        self.sampler.jumps()
    }

    /// Descent per unit of travel for chunk `index`.
    pub fn slope_for_chunk(&self, index: u64) -> f64 {
        let p = &self.params;
        let variation = self
            .slope_noise
            .sample(index as f64 * p.slope_noise_scale, SLOPE_NOISE_ROW);
        (p.base_slope + variation * p.slope_variation).max(0.0)
    }

    /// Generate the next chunk: spine, jump coverage and obstacle plan.
    pub fn generate_next_chunk(&mut self) -> GeneratedChunk {
        let start = Instant::now();
        let index = self.next_chunk;
        let count = self.params.segments_per_chunk;
        let slope_tangent = self.slope_for_chunk(index);

        let points = self.spine.generate_segment(
            index * count as u64,
            count,
            self.altitude,
            slope_tangent,
            &self.tail,
        );
        self.altitude -= slope_tangent * count as f64 * self.spine.params().segment_length;
        if !points.is_empty() {
            self.tail = TailContext::from_points(&points, self.params.tail_len);
        }

        let jumps = match (points.first(), points.last()) {
            (Some(first), Some(last)) => {
                self.sampler.jumps_mut().ensure_coverage(last.s);
                self.sampler
                    .jumps()
                    .ramps_between(first.s, last.s)
                    .copied()
                    .collect()
            }
            _ => Vec::new(),
        };

        let spacing = self.planner.params().grid_spacing;
        let mut rng = chunk_rng(self.params.seed, index);
        let placements =
            self.planner
                .plan_region(&mut self.sampler, &self.scatter, &points, spacing, &mut rng);

        self.retain(&points);
        self.next_chunk += 1;

        let generation_time_us = start.elapsed().as_micros() as u64;
        tracing::debug!(
            chunk = index,
            points = points.len(),
            jumps = jumps.len(),
            placements = placements.len(),
            slope = slope_tangent,
            altitude = self.altitude,
            generation_time_us,
            "generated chunk"
        );

        GeneratedChunk {
            index,
            points,
            jumps,
            placements,
            slope_tangent,
            generation_time_us,
        }
    }

    /// Sample the terrain at a world position against the retained window.
    pub fn sample_terrain(&mut self, world_x: f64, world_z: f64) -> Option<TerrainSample> {
        self.sampler.sample_nearest(&self.window, world_x, world_z)
    }

    /// Row-major lattice of samples over a chunk: one row per path point,
    /// `columns` samples evenly spread across the full corridor.
    pub fn sample_grid(&mut self, chunk: &GeneratedChunk, columns: usize) -> Vec<TerrainSample> {
        if columns == 0 {
            return Vec::new();
        }
        let margin = self.planner.params().plateau_margin;
        let mut samples = Vec::with_capacity(chunk.points.len() * columns);
        for point in &chunk.points {
            let extent = self.sampler.params().corridor_half_width(point.half_width()) + margin;
            for column in 0..columns {
                let t = if columns == 1 {
                    0.0
                } else {
                    -extent + 2.0 * extent * column as f64 / (columns - 1) as f64
                };
                let x = point.position.x + point.right.x * t;
                let z = point.position.z + point.right.y * t;
                samples.push(self.sampler.sample_at(x, z, point));
            }
        }
        samples
    }

    fn retain(&mut self, points: &[PathPoint]) {
        self.window.extend_from_slice(points);
        self.window_chunks.push_back(points.len());
        let keep = self.params.retained_chunks.max(1);
        while self.window_chunks.len() > keep {
            if let Some(dropped) = self.window_chunks.pop_front() {
                self.window.drain(..dropped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceKind;

    fn config(seed: u64) -> RideConfig {
        RideConfig {
            ride: RideParams {
                seed,
                segments_per_chunk: 24,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_chunks_are_contiguous() {
        let mut session = RideSession::new(config(7));
        let a = session.generate_next_chunk();
        let b = session.generate_next_chunk();
        let step = PathParams::default().segment_length;

        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert_eq!(b.points[0].index, 24);
        assert!((b.points[0].position.z + 24.0 * step).abs() < 1e-9);

        let last_a = a.points.last().unwrap();
        let first_b = b.points[0];
        let gap = first_b.position - last_a.position;
        assert!(first_b.s > last_a.s, "Arc-length must keep increasing");
        assert!(
            (first_b.s - last_a.s - gap.length()).abs() < 1e-6,
            "Arc-length step across the boundary should match the point distance"
        );
    }

    #[test]
    fn test_altitude_continues_across_chunks() {
        let mut session = RideSession::new(config(3));
        let a = session.generate_next_chunk();
        let b = session.generate_next_chunk();
        let step = PathParams::default().segment_length;

        let expected = a.points[0].position.y - a.slope_tangent * 24.0 * step;
        assert!((b.points[0].position.y - expected).abs() < 1e-9);
        assert!((session.altitude() - (expected - b.slope_tangent * 24.0 * step)).abs() < 1e-9);
        assert!(a.points[0].position.y == RideParams::default().start_altitude);
    }

    #[test]
    fn test_same_seed_same_ride() {
        let mut first = RideSession::new(config(99));
        let mut second = RideSession::new(config(99));
        for _ in 0..3 {
            let a = first.generate_next_chunk();
            let b = second.generate_next_chunk();
            assert_eq!(a.points, b.points);
            assert_eq!(a.jumps, b.jumps);
            assert_eq!(a.placements, b.placements);
        }
    }

    #[test]
    fn test_different_seed_different_ride() {
        let a = RideSession::new(config(1)).generate_next_chunk();
        let b = RideSession::new(config(2)).generate_next_chunk();
        assert_ne!(a.points, b.points);
    }

    #[test]
    fn test_window_retention() {
        let mut session = RideSession::new(RideConfig {
            ride: RideParams {
                segments_per_chunk: 10,
                retained_chunks: 2,
                ..Default::default()
            },
            ..Default::default()
        });
        for _ in 0..5 {
            session.generate_next_chunk();
        }
        assert_eq!(session.window().len(), 20);
        assert_eq!(session.window()[0].index, 30);
        assert_eq!(session.next_chunk_index(), 5);
    }

    #[test]
    fn test_chunk_jumps_overlap_chunk() {
        let mut session = RideSession::new(config(11));
        for _ in 0..8 {
            let chunk = session.generate_next_chunk();
            let (from, to) = chunk.arc_range().unwrap();
            for ramp in &chunk.jumps {
                assert!(ramp.end() >= from && ramp.start <= to);
            }
        }
    }

    #[test]
    fn test_sample_terrain_on_centerline() {
        let mut session = RideSession::new(config(5));
        let chunk = session.generate_next_chunk();
        let point = chunk.points[10];
        let sample = session
            .sample_terrain(point.position.x, point.position.z)
            .unwrap();
        assert_eq!(sample.kind, SurfaceKind::Track);
        assert!(sample.t.abs() < 1e-9);
    }

    #[test]
    fn test_sample_terrain_without_window() {
        let mut session = RideSession::new(config(5));
        assert!(session.sample_terrain(0.0, 0.0).is_none());
    }

    #[test]
    fn test_sample_grid_spans_corridor() {
        let mut session = RideSession::new(config(8));
        let chunk = session.generate_next_chunk();
        let columns = 41;
        let grid = session.sample_grid(&chunk, columns);

        assert_eq!(grid.len(), chunk.points.len() * columns);
        for row in grid.chunks(columns) {
            assert_eq!(row[columns / 2].kind, SurfaceKind::Track);
            assert_eq!(row[0].kind, SurfaceKind::Plateau);
            assert_eq!(row[columns - 1].kind, SurfaceKind::Plateau);
            assert!(row.windows(2).all(|w| w[0].t < w[1].t));
        }
        assert!(session.sample_grid(&chunk, 0).is_empty());
    }

    #[test]
    fn test_slope_stays_in_band() {
        let session = RideSession::new(config(4));
        let p = RideParams::default();
        for index in 0..50 {
            let slope = session.slope_for_chunk(index);
            assert!(slope >= p.base_slope - p.slope_variation - 1e-12);
            assert!(slope <= p.base_slope + p.slope_variation + 1e-12);
        }
    }
}
