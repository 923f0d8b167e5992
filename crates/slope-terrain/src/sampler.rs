//! Per-point terrain sampling and classification.
//!
//! Projects a world XZ position into the local frame of its nearest path
//! point, classifies the canyon cross-section there and composes the final
//! height: base path height, banking, moguls, wall/plateau shaping and jumps.

use serde::{Deserialize, Serialize};

use crate::jumps::JumpScheduler;
use crate::noise_source::NoiseSource;
use crate::path::{PathPoint, nearest_path_point};
use crate::seed::smoothstep;
use crate::surface::SurfaceKind;

/// Noise-space offsets that decorrelate the shaping layers of one noise field.
const WALL_FINE_OFFSET: f64 = 113.7;
const PLATEAU_OFFSET: f64 = -251.3;

/// Relative frequency and weight of the fine wall displacement layer.
const WALL_FINE_FREQUENCY: f64 = 3.1;
const WALL_FINE_WEIGHT: f64 = 0.35;

/// Canyon cross-section parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainParams {
    /// Frequency of the mogul noise in local `(t, s)` space.
    pub mogul_scale: f64,
    /// Amplitude of the moguls.
    pub mogul_height: f64,
    /// Width of the flat floor margin beyond the track edge.
    pub floor_offset: f64,
    /// Width of the bank within the floor margin; `None` makes the whole margin bank.
    pub bank_width: Option<f64>,
    /// Horizontal extent of the cliff wall.
    pub wall_width: f64,
    /// Height of the plateau above the canyon floor.
    pub canyon_height: f64,
    /// Number of terraces the wall is stepped into.
    pub terrace_count: u32,
    /// Fraction at each end of a terrace that forms a flat ledge.
    pub ledge_fraction: f64,
    /// Frequency of the wall displacement noise.
    pub wall_noise_scale: f64,
    /// Amplitude of the wall displacement noise.
    pub wall_noise_height: f64,
    /// Frequency of the plateau roughness.
    pub plateau_noise_scale: f64,
    /// Amplitude of the plateau roughness.
    pub plateau_noise_height: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            mogul_scale: 0.08,
            mogul_height: 0.5,
            floor_offset: 5.0,
            bank_width: None,
            wall_width: 20.0,
            canyon_height: 30.0,
            terrace_count: 4,
            ledge_fraction: 0.15,
            wall_noise_scale: 0.06,
            wall_noise_height: 1.5,
            plateau_noise_scale: 0.02,
            plateau_noise_height: 1.0,
        }
    }
}

impl TerrainParams {
    /// Height of one terrace step.
    pub fn terrace_step(&self) -> f64 {
        self.canyon_height / self.terrace_count.max(1) as f64
    }

    /// Lateral distance from the centerline to the foot of the wall.
    pub fn canyon_floor_half_width(&self, half_track: f64) -> f64 {
        half_track + self.floor_offset
    }

    /// Lateral distance from the centerline to the plateau edge.
    pub fn corridor_half_width(&self, half_track: f64) -> f64 {
        self.canyon_floor_half_width(half_track) + self.wall_width
    }

    /// Progress across the wall, `0` at its foot and `1` at the plateau edge.
    pub fn wall_progress(&self, abs_t: f64, half_track: f64) -> f64 {
        let foot = self.canyon_floor_half_width(half_track);
        if self.wall_width <= 0.0 {
            return if abs_t > foot { 1.0 } else { 0.0 };
        }
        ((abs_t - foot) / self.wall_width).clamp(0.0, 1.0)
    }

    /// Terrace index and sub-progress within the terrace for a wall progress.
    pub fn terrace_position(&self, progress: f64) -> (u32, f64) {
        let count = self.terrace_count.max(1);
        let scaled = progress.clamp(0.0, 1.0) * count as f64;
        let index = (scaled.floor() as u32).min(count - 1);
        (index, scaled - index as f64)
    }

    /// Returns `true` if the sub-progress lies on the flat part of a terrace.
    pub fn is_ledge(&self, sub: f64) -> bool {
        sub < self.ledge_fraction || sub > 1.0 - self.ledge_fraction
    }

    /// Height of the terraced wall above the canyon floor at a wall progress.
    ///
    /// Flat at each ledge, smoothstep rise across the face between them.
    pub fn terrace_height(&self, progress: f64) -> f64 {
        let (index, sub) = self.terrace_position(progress);
        let step = self.terrace_step();
        let face = 1.0 - 2.0 * self.ledge_fraction;
        let rise = if face <= 0.0 {
            if sub < 0.5 { 0.0 } else { 1.0 }
        } else {
            smoothstep((sub - self.ledge_fraction) / face)
        };
        (index as f64 + rise) * step
    }

    /// Classify a lateral offset. A pure step function of `|t|`.
    pub fn classify(&self, t: f64, half_track: f64) -> SurfaceKind {
        let abs_t = t.abs();
        if abs_t <= self.canyon_floor_half_width(half_track) {
            if abs_t <= half_track {
                return SurfaceKind::Track;
            }
            return match self.bank_width {
                Some(bank) if abs_t > half_track + bank => SurfaceKind::CanyonFloor,
                _ => SurfaceKind::Bank,
            };
        }
        let progress = self.wall_progress(abs_t, half_track);
        if progress >= 1.0 {
            return SurfaceKind::Plateau;
        }
        let (_, sub) = self.terrace_position(progress);
        if self.is_ledge(sub) {
            SurfaceKind::WallLedge
        } else {
            SurfaceKind::WallVertical
        }
    }
}

/// Classification and height of the terrain at one world position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainSample {
    /// Final terrain height.
    pub height: f64,
    /// Surface classification.
    pub kind: SurfaceKind,
    /// `true` only on [`SurfaceKind::WallVertical`].
    pub is_wall: bool,
    /// Signed lateral offset from the centerline (positive to the right).
    pub t: f64,
    /// Arc-length coordinate of the sample.
    pub s: f64,
    /// Signed distance beyond the track's outer edge (negative on the track).
    pub dist_from_track_edge: f64,
    /// Ordinal of the jump ramp felt at this sample, if any. `None` beside
    /// a ramp's lateral band.
    pub jump: Option<usize>,
}

/// Samples and classifies terrain around the ride path.
///
/// Owns the jump schedule, whose lookup cursor is the only state that changes
/// across calls; the returned samples depend only on the inputs and the seed.
pub struct TerrainSampler<N> {
    params: TerrainParams,
    noise: N,
    jumps: JumpScheduler,
}

impl<N: NoiseSource> TerrainSampler<N> {
    /// Create a sampler.
    pub fn new(params: TerrainParams, noise: N, jumps: JumpScheduler) -> Self {
        Self {
            params,
            noise,
            jumps,
        }
    }

    /// Return a reference to the cross-section parameters.
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// The jump schedule.
    pub fn jumps(&self) -> &JumpScheduler {
        &self.jumps
    }

    /// Mutable access to the jump schedule (e.g. to pre-extend coverage).
    pub fn jumps_mut(&mut self) -> &mut JumpScheduler {
        &mut self.jumps
    }

    /// Sample the terrain at a world position relative to its nearest path point.
    pub fn sample_at(&mut self, world_x: f64, world_z: f64, point: &PathPoint) -> TerrainSample {
        let dx = world_x - point.position.x;
        let dz = world_z - point.position.z;
        let t = dx * point.right.x + dz * point.right.y;
        let along = dx * point.forward.x + dz * point.forward.y;
        let s = point.s + along;

        let p = &self.params;
        let half_track = point.half_width();
        let kind = p.classify(t, half_track);

        let base = point.position.y + along * point.grade;
        let banking = t * point.banking;
        let moguls = self.noise.sample(t * p.mogul_scale, s * p.mogul_scale) * p.mogul_height;

        let extra = match kind {
            SurfaceKind::Track | SurfaceKind::Bank | SurfaceKind::CanyonFloor => 0.0,
            SurfaceKind::WallVertical | SurfaceKind::WallLedge => {
                let progress = p.wall_progress(t.abs(), half_track);
                p.terrace_height(progress) + self.wall_displacement(t, s) * edge_fade(progress)
            }
            SurfaceKind::Plateau => {
                let n = p.plateau_noise_scale;
                p.canyon_height
                    + self.noise.sample(s * n + PLATEAU_OFFSET, t * n) * p.plateau_noise_height
            }
        };

        let (jump_height, jump) = if kind.carries_jumps() {
            let lookup = self.jumps.banded_offset_at(s, t, half_track);
            (lookup.offset, lookup.index)
        } else {
            (0.0, None)
        };

        TerrainSample {
            height: base + banking + moguls + extra + jump_height,
            kind,
            is_wall: kind == SurfaceKind::WallVertical,
            t,
            s,
            dist_from_track_edge: t.abs() - half_track,
            jump,
        }
    }

    /// Sample at a world position against the nearest point of `points`.
    pub fn sample_nearest(
        &mut self,
        points: &[PathPoint],
        world_x: f64,
        world_z: f64,
    ) -> Option<TerrainSample> {
        let point = *nearest_path_point(points, world_x, world_z)?;
        Some(self.sample_at(world_x, world_z, &point))
    }

    /// Coarse plus fine displacement of the cliff face.
    fn wall_displacement(&self, t: f64, s: f64) -> f64 {
        let p = &self.params;
        let n = p.wall_noise_scale;
        let coarse = self.noise.sample(s * n, t * n);
        let fine = self.noise.sample(
            s * n * WALL_FINE_FREQUENCY + WALL_FINE_OFFSET,
            t * n * WALL_FINE_FREQUENCY,
        );
        (coarse + fine * WALL_FINE_WEIGHT) * p.wall_noise_height
    }
}

/// Weight that vanishes at both edges of the wall and peaks mid-face.
fn edge_fade(progress: f64) -> f64 {
    4.0 * progress * (1.0 - progress)
}
