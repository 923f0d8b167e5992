//! Obstacle placement: grid scan over a generated region with per-surface
//! probability tables.
//!
//! Every cell of a world-aligned grid is sampled against the terrain, mapped
//! to one of four placement zones and run through that zone's rules. All
//! rolls come from the caller's seeded RNG, so a chunk's layout is
//! reproducible.

use glam::{DQuat, DVec3, EulerRot};
use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::noise_source::NoiseSource;
use crate::path::{PathPoint, nearest_path_point};
use crate::sampler::TerrainSampler;
use crate::seed::{sample_normal, sample_range};
use crate::surface::SurfaceKind;

/// Fraction of a cell over which placements are jittered.
const CELL_JITTER: f64 = 0.8;

/// Maximum tree lean in radians (about 4 degrees).
const MAX_TREE_LEAN: f64 = 0.07;

/// Per-axis scale jitter of rocks and dead trees.
const ROCK_SCALE_JITTER: f64 = 0.2;
const DEAD_TREE_SCALE_JITTER: f64 = 0.1;

/// Tree archetype by size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeSize {
    Small,
    Medium,
    Large,
}

/// What gets placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    /// A living tree of the given archetype.
    Tree(TreeSize),
    /// A fallen dead tree (log).
    DeadTree,
    /// A boulder.
    Rock,
}

/// The four rule tables surfaces are grouped into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObstacleZone {
    Track,
    Bank,
    Cliff,
    Plateau,
}

impl ObstacleZone {
    /// Zone whose rules apply on a surface.
    pub fn of(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Track => Self::Track,
            SurfaceKind::Bank | SurfaceKind::CanyonFloor => Self::Bank,
            SurfaceKind::WallVertical | SurfaceKind::WallLedge => Self::Cliff,
            SurfaceKind::Plateau => Self::Plateau,
        }
    }
}

/// Relative weights of obstacle types (Track rule).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TypeProportions {
    pub tree: f64,
    pub rock: f64,
    pub dead_tree: f64,
}

impl Default for TypeProportions {
    fn default() -> Self {
        Self {
            tree: 0.2,
            rock: 0.6,
            dead_tree: 0.2,
        }
    }
}

/// Relative weights of tree sizes (Track rule).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizeProportions {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
}

impl Default for SizeProportions {
    fn default() -> Self {
        Self {
            small: 0.7,
            medium: 0.3,
            large: 0.0,
        }
    }
}

/// Maps a normalized noise range `[min, max)` to a candidate tree size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoiseBand {
    pub min: f64,
    pub max: f64,
    pub size: TreeSize,
    /// A zero proportion disables the band.
    pub proportion: f64,
    /// Spawn probability once the band matches.
    pub probability: f64,
}

impl NoiseBand {
    /// Shorthand for an enabled band.
    pub fn new(min: f64, max: f64, size: TreeSize, probability: f64) -> Self {
        Self {
            min,
            max,
            size,
            proportion: 1.0,
            probability,
        }
    }

    /// Returns `true` if `noise` falls inside the band.
    pub fn matches(&self, noise: f64) -> bool {
        noise >= self.min && noise < self.max
    }
}

/// Noise range that spawns dead trees on the plateau.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeadTreeBand {
    pub min: f64,
    pub max: f64,
    pub probability: f64,
}

/// Placement rules for one zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurfaceRules {
    /// Probability that a cell of this zone is considered at all.
    pub rarity: f64,
    /// Track: obstacle type weights.
    pub type_proportions: TypeProportions,
    /// Track: tree size weights.
    pub size_proportions: SizeProportions,
    /// Bank, Cliff, Plateau: noise bands, checked in order.
    pub noise_bands: Vec<NoiseBand>,
    /// Bank, Cliff, Plateau: rock probability when no tree qualified.
    pub rock_fallback: f64,
    /// Plateau: dead tree band checked before the tree bands.
    pub dead_tree_band: Option<DeadTreeBand>,
}

impl Default for SurfaceRules {
    fn default() -> Self {
        Self {
            rarity: 1.0,
            type_proportions: TypeProportions::default(),
            size_proportions: SizeProportions::default(),
            noise_bands: Vec::new(),
            rock_fallback: 0.0,
            dead_tree_band: None,
        }
    }
}

impl SurfaceRules {
    /// Rules that never place anything.
    pub fn none() -> Self {
        Self {
            rarity: 0.0,
            ..Default::default()
        }
    }
}

/// Normal distribution of a tree size's scale, clamped to `[min, max]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeScale {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl TreeScale {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        sample_normal(rng, self.mean, self.std_dev).clamp(self.min, self.max.max(self.min))
    }
}

/// Scale distributions per tree size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TreeScales {
    pub small: TreeScale,
    pub medium: TreeScale,
    pub large: TreeScale,
}

impl Default for TreeScales {
    fn default() -> Self {
        Self {
            small: TreeScale {
                mean: 0.8,
                std_dev: 0.15,
                min: 0.5,
                max: 1.1,
            },
            medium: TreeScale {
                mean: 1.3,
                std_dev: 0.2,
                min: 0.9,
                max: 1.8,
            },
            large: TreeScale {
                mean: 2.0,
                std_dev: 0.3,
                min: 1.5,
                max: 2.8,
            },
        }
    }
}

impl TreeScales {
    /// Distribution for one size.
    pub fn get(&self, size: TreeSize) -> &TreeScale {
        match size {
            TreeSize::Small => &self.small,
            TreeSize::Medium => &self.medium,
            TreeSize::Large => &self.large,
        }
    }
}

/// Maximum placements per obstacle bucket and region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BucketCapacity {
    pub small_tree: usize,
    pub medium_tree: usize,
    pub large_tree: usize,
    pub dead_tree: usize,
    pub rock: usize,
}

impl Default for BucketCapacity {
    fn default() -> Self {
        Self {
            small_tree: 400,
            medium_tree: 300,
            large_tree: 200,
            dead_tree: 60,
            rock: 120,
        }
    }
}

impl BucketCapacity {
    /// Same capacity for every bucket.
    pub fn uniform(capacity: usize) -> Self {
        Self {
            small_tree: capacity,
            medium_tree: capacity,
            large_tree: capacity,
            dead_tree: capacity,
            rock: capacity,
        }
    }

    /// Capacity of the bucket `kind` belongs to.
    pub fn of(&self, kind: ObstacleKind) -> usize {
        match kind {
            ObstacleKind::Tree(TreeSize::Small) => self.small_tree,
            ObstacleKind::Tree(TreeSize::Medium) => self.medium_tree,
            ObstacleKind::Tree(TreeSize::Large) => self.large_tree,
            ObstacleKind::DeadTree => self.dead_tree,
            ObstacleKind::Rock => self.rock,
        }
    }
}

/// Obstacle scatter parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObstacleParams {
    /// Spacing of the scan grid.
    pub grid_spacing: f64,
    /// Frequency of the scatter noise.
    pub noise_scale: f64,
    /// How far past the plateau edge the scan extends.
    pub plateau_margin: f64,
    /// Per-bucket capacities.
    pub capacity: BucketCapacity,
    /// Tree scale distributions.
    pub tree_scales: TreeScales,
    /// Uniform base scale range of rocks.
    pub rock_scale: (f64, f64),
    /// Base scale of dead trees.
    pub dead_tree_scale: f64,
    pub track: SurfaceRules,
    pub bank: SurfaceRules,
    pub cliff: SurfaceRules,
    pub plateau: SurfaceRules,
}

impl Default for ObstacleParams {
    fn default() -> Self {
        Self {
            grid_spacing: 6.0,
            noise_scale: 0.05,
            plateau_margin: 15.0,
            capacity: BucketCapacity::default(),
            tree_scales: TreeScales::default(),
            rock_scale: (0.6, 1.6),
            dead_tree_scale: 1.0,
            track: SurfaceRules {
                rarity: 0.01,
                ..Default::default()
            },
            bank: SurfaceRules {
                noise_bands: vec![
                    NoiseBand::new(0.55, 0.7, TreeSize::Small, 0.15),
                    NoiseBand::new(0.7, 0.85, TreeSize::Medium, 0.25),
                    NoiseBand::new(0.85, 1.01, TreeSize::Large, 0.35),
                ],
                rock_fallback: 0.02,
                ..Default::default()
            },
            cliff: SurfaceRules {
                noise_bands: vec![
                    NoiseBand::new(0.6, 0.8, TreeSize::Small, 0.08),
                    NoiseBand::new(0.8, 1.01, TreeSize::Medium, 0.12),
                ],
                rock_fallback: 0.05,
                ..Default::default()
            },
            plateau: SurfaceRules {
                noise_bands: vec![
                    NoiseBand::new(0.4, 0.6, TreeSize::Small, 0.2),
                    NoiseBand::new(0.6, 0.8, TreeSize::Medium, 0.3),
                    NoiseBand::new(0.8, 1.01, TreeSize::Large, 0.4),
                ],
                rock_fallback: 0.01,
                dead_tree_band: Some(DeadTreeBand {
                    min: 0.0,
                    max: 0.15,
                    probability: 0.2,
                }),
                ..Default::default()
            },
        }
    }
}

impl ObstacleParams {
    /// Rules of one zone.
    pub fn rules(&self, zone: ObstacleZone) -> &SurfaceRules {
        match zone {
            ObstacleZone::Track => &self.track,
            ObstacleZone::Bank => &self.bank,
            ObstacleZone::Cliff => &self.cliff,
            ObstacleZone::Plateau => &self.plateau,
        }
    }
}

/// Position, rotation and scale of a placed obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleTransform {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

/// A placement decision handed to the renderer / physics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstaclePlacement {
    pub kind: ObstacleKind,
    pub transform: ObstacleTransform,
    /// Surface the obstacle was placed on.
    pub surface: SurfaceKind,
}

/// Pick an item by normalized weight. `None` when all weights are zero.
fn pick_weighted<T: Copy, R: Rng + ?Sized>(rng: &mut R, items: &[(T, f64)]) -> Option<T> {
    let total: f64 = items.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.random::<f64>() * total;
    for &(item, weight) in items {
        let weight = weight.max(0.0);
        if roll < weight {
            return Some(item);
        }
        roll -= weight;
    }
    items.iter().rev().find(|(_, w)| *w > 0.0).map(|(item, _)| *item)
}

/// Decides and positions obstacles for a region of the ride.
pub struct ObstaclePlanner {
    params: ObstacleParams,
}

impl ObstaclePlanner {
    /// Create a planner.
    pub fn new(params: ObstacleParams) -> Self {
        Self { params }
    }

    /// Return a reference to the scatter parameters.
    pub fn params(&self) -> &ObstacleParams {
        &self.params
    }

    /// Scan the region spanned by `points` on a grid of `grid_spacing` and
    /// return every placement that passed its zone's rules and bucket capacity.
    pub fn plan_region<N, S, R>(
        &self,
        sampler: &mut TerrainSampler<N>,
        scatter: &S,
        points: &[PathPoint],
        grid_spacing: f64,
        rng: &mut R,
    ) -> Vec<ObstaclePlacement>
    where
        N: NoiseSource,
        S: NoiseSource,
        R: Rng + ?Sized,
    {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Vec::new();
        };
        if grid_spacing <= 0.0 {
            return Vec::new();
        }

        let terrain = sampler.params().clone();
        let corridor = |half_track: f64| {
            terrain.corridor_half_width(half_track) + self.params.plateau_margin
        };
        let max_half_track = points.iter().map(|p| p.half_width()).fold(0.0, f64::max);
        let extent = corridor(max_half_track);

        let (min_x, max_x) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
            (lo.min(p.position.x), hi.max(p.position.x))
        });
        let min_x = min_x - extent;
        let max_x = max_x + extent;
        let z_hi = first.position.z;
        let trailing = match points {
            [.., a, b] => a.position.z - b.position.z,
            _ => grid_spacing,
        };
        let z_lo = last.position.z - trailing;

        let columns = ((max_x - min_x) / grid_spacing).ceil() as usize;
        let rows = ((z_hi - z_lo) / grid_spacing).ceil() as usize;

        let mut counts: HashMap<ObstacleKind, usize> = HashMap::new();
        let mut placements = Vec::new();
        let mut skipped_full = 0usize;

        for row in 0..rows {
            let cell_z = z_hi - (row as f64 + 0.5) * grid_spacing;
            for column in 0..columns {
                let cell_x = min_x + (column as f64 + 0.5) * grid_spacing;
                let x = cell_x + (rng.random::<f64>() - 0.5) * grid_spacing * CELL_JITTER;
                let z = cell_z + (rng.random::<f64>() - 0.5) * grid_spacing * CELL_JITTER;
                if z > z_hi || z <= z_lo {
                    continue;
                }

                let Some(point) = nearest_path_point(points, x, z) else {
                    continue;
                };
                let sample = sampler.sample_at(x, z, point);
                if sample.t.abs() > corridor(point.half_width()) {
                    continue;
                }
                // `jump` is only reported on a ramp's lateral band.
                if sample.jump.is_some() && sample.kind == SurfaceKind::Track {
                    continue;
                }

                let n = self.params.noise_scale;
                let noise = scatter.sample_unit(x * n, z * n);
                let Some(kind) = self.decide(ObstacleZone::of(sample.kind), noise, rng) else {
                    continue;
                };

                let count = counts.entry(kind).or_insert(0);
                if *count >= self.params.capacity.of(kind) {
                    skipped_full += 1;
                    continue;
                }
                *count += 1;

                placements.push(ObstaclePlacement {
                    kind,
                    transform: self.transform(kind, DVec3::new(x, sample.height, z), rng),
                    surface: sample.kind,
                });
            }
        }

        tracing::debug!(
            placed = placements.len(),
            skipped_full,
            rows,
            columns,
            "planned obstacle region"
        );
        placements
    }

    /// Run one zone's rules for a cell with normalized noise `noise`.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        zone: ObstacleZone,
        noise: f64,
        rng: &mut R,
    ) -> Option<ObstacleKind> {
        let rules = self.params.rules(zone);
        if rules.rarity <= 0.0 || rng.random::<f64>() >= rules.rarity {
            return None;
        }

        match zone {
            ObstacleZone::Track => {
                let types = &rules.type_proportions;
                let picked = pick_weighted(
                    rng,
                    &[
                        (ObstacleKind::Tree(TreeSize::Small), types.tree),
                        (ObstacleKind::Rock, types.rock),
                        (ObstacleKind::DeadTree, types.dead_tree),
                    ],
                )?;
                match picked {
                    ObstacleKind::Tree(_) => {
                        let sizes = &rules.size_proportions;
                        let size = pick_weighted(
                            rng,
                            &[
                                (TreeSize::Small, sizes.small),
                                (TreeSize::Medium, sizes.medium),
                                (TreeSize::Large, sizes.large),
                            ],
                        )?;
                        Some(ObstacleKind::Tree(size))
                    }
                    other => Some(other),
                }
            }
            ObstacleZone::Bank | ObstacleZone::Cliff => Self::banded(rules, noise, rng),
            ObstacleZone::Plateau => {
                if let Some(band) = &rules.dead_tree_band
                    && noise >= band.min
                    && noise < band.max
                    && rng.random::<f64>() < band.probability
                {
                    return Some(ObstacleKind::DeadTree);
                }
                Self::banded(rules, noise, rng)
            }
        }
    }

    /// Noise-band tree selection with the rock fallback.
    fn banded<R: Rng + ?Sized>(rules: &SurfaceRules, noise: f64, rng: &mut R) -> Option<ObstacleKind> {
        for band in &rules.noise_bands {
            if band.matches(noise) && band.proportion > 0.0 && rng.random::<f64>() < band.probability
            {
                return Some(ObstacleKind::Tree(band.size));
            }
        }
        (rng.random::<f64>() < rules.rock_fallback).then_some(ObstacleKind::Rock)
    }

    fn transform<R: Rng + ?Sized>(
        &self,
        kind: ObstacleKind,
        position: DVec3,
        rng: &mut R,
    ) -> ObstacleTransform {
        let yaw = rng.random::<f64>() * std::f64::consts::TAU;
        let (rotation, scale) = match kind {
            ObstacleKind::Tree(size) => {
                let scale = self.params.tree_scales.get(size).sample(rng);
                let lean_x = (rng.random::<f64>() * 2.0 - 1.0) * MAX_TREE_LEAN;
                let lean_z = (rng.random::<f64>() * 2.0 - 1.0) * MAX_TREE_LEAN;
                (
                    DQuat::from_euler(EulerRot::YXZ, yaw, lean_x, lean_z),
                    DVec3::splat(scale),
                )
            }
            ObstacleKind::Rock => {
                let pitch = rng.random::<f64>() * std::f64::consts::TAU;
                let roll = rng.random::<f64>() * std::f64::consts::TAU;
                let base = sample_range(rng, self.params.rock_scale);
                let jitter = DVec3::new(
                    1.0 + (rng.random::<f64>() * 2.0 - 1.0) * ROCK_SCALE_JITTER,
                    1.0 + (rng.random::<f64>() * 2.0 - 1.0) * ROCK_SCALE_JITTER,
                    1.0 + (rng.random::<f64>() * 2.0 - 1.0) * ROCK_SCALE_JITTER,
                );
                (
                    DQuat::from_euler(EulerRot::YXZ, yaw, pitch, roll),
                    jitter * base,
                )
            }
            ObstacleKind::DeadTree => {
                let jitter = 1.0 + (rng.random::<f64>() * 2.0 - 1.0) * DEAD_TREE_SCALE_JITTER;
                (
                    DQuat::from_euler(EulerRot::YXZ, yaw, 0.0, std::f64::consts::FRAC_PI_2),
                    DVec3::splat(self.params.dead_tree_scale * jitter),
                )
            }
        };
        ObstacleTransform {
            position,
            rotation,
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jumps::{JumpParams, JumpScheduler};
    use crate::noise_source::SimplexNoise;
    use crate::path::{PathParams, PathSpineGenerator, TailContext};
    use crate::sampler::TerrainParams;
    use crate::seed::chunk_rng;

    fn region(seed: u32) -> Vec<PathPoint> {
        let spine = PathSpineGenerator::new(PathParams::default(), SimplexNoise::new(seed));
        spine.generate_segment(0, 48, 500.0, 0.12, &TailContext::empty())
    }

    fn sampler(seed: u32) -> TerrainSampler<SimplexNoise> {
        TerrainSampler::new(
            TerrainParams::default(),
            SimplexNoise::new(seed),
            JumpScheduler::new(JumpParams::default(), seed as u64),
        )
    }

    fn all_rules(rules: SurfaceRules) -> ObstacleParams {
        ObstacleParams {
            track: rules.clone(),
            bank: rules.clone(),
            cliff: rules.clone(),
            plateau: rules,
            ..Default::default()
        }
    }

    fn generous_rules() -> SurfaceRules {
        SurfaceRules {
            rarity: 1.0,
            noise_bands: vec![NoiseBand::new(0.0, 1.01, TreeSize::Medium, 1.0)],
            rock_fallback: 1.0,
            ..Default::default()
        }
    }

    fn straight_point(index: u64, s: f64) -> PathPoint {
        PathPoint {
            index,
            position: DVec3::new(0.0, 100.0, -s),
            heading: 0.0,
            width: 40.0,
            banking: 0.0,
            s,
            grade: 0.0,
            forward: glam::DVec2::new(0.0, -1.0),
            right: glam::DVec2::new(1.0, 0.0),
        }
    }

    #[test]
    fn test_track_beside_jump_band_keeps_obstacles() {
        let mut terrain = sampler(12);
        terrain.jumps_mut().ensure_coverage(0.0);
        let ramp = terrain.jumps().ramps()[0];
        let points: Vec<PathPoint> = (0..13)
            .map(|i| straight_point(i, ramp.start - 8.0 + i as f64 * 4.0))
            .collect();

        let planner = ObstaclePlanner::new(ObstacleParams {
            capacity: BucketCapacity::uniform(100_000),
            track: SurfaceRules {
                rarity: 1.0,
                type_proportions: TypeProportions {
                    tree: 0.0,
                    rock: 1.0,
                    dead_tree: 0.0,
                },
                ..Default::default()
            },
            bank: SurfaceRules::none(),
            cliff: SurfaceRules::none(),
            plateau: SurfaceRules::none(),
            ..Default::default()
        });
        let placements = planner.plan_region(
            &mut terrain,
            &SimplexNoise::new(13),
            &points,
            1.0,
            &mut chunk_rng(12, 0),
        );

        let softness = JumpParams::default().band_edge_softness;
        let mut beside_ramp = 0;
        for p in &placements {
            assert_eq!(p.surface, SurfaceKind::Track);
            let (s, t) = (-p.transform.position.z, p.transform.position.x);
            if ramp.contains(s) {
                let weight = ramp.lateral_weight(t, 20.0, softness);
                assert!(weight <= 0.0, "Obstacle on the jump band at s={s}, t={t}");
                beside_ramp += 1;
            }
        }
        assert!(
            beside_ramp > 0,
            "Track cells beside the band within the ramp's interval should be planted"
        );
    }

    #[test]
    fn test_zero_rarity_places_nothing() {
        let planner = ObstaclePlanner::new(all_rules(SurfaceRules::none()));
        let points = region(3);
        let mut rng = chunk_rng(3, 0);
        let placements =
            planner.plan_region(&mut sampler(3), &SimplexNoise::new(4), &points, 4.0, &mut rng);
        assert!(placements.is_empty());
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let params = ObstacleParams {
            capacity: BucketCapacity::uniform(5),
            ..all_rules(generous_rules())
        };
        let planner = ObstaclePlanner::new(params);
        let points = region(8);
        let mut rng = chunk_rng(8, 0);
        let placements =
            planner.plan_region(&mut sampler(8), &SimplexNoise::new(9), &points, 3.0, &mut rng);

        let mut counts: HashMap<ObstacleKind, usize> = HashMap::new();
        for p in &placements {
            *counts.entry(p.kind).or_insert(0) += 1;
        }
        assert!(!counts.is_empty(), "Generous rules should place something");
        for (kind, count) in counts {
            assert!(count <= 5, "{kind:?} bucket overflowed: {count}");
        }
    }

    #[test]
    fn test_zero_capacity_degrades_to_empty() {
        let params = ObstacleParams {
            capacity: BucketCapacity::uniform(0),
            ..all_rules(generous_rules())
        };
        let planner = ObstaclePlanner::new(params);
        let mut rng = chunk_rng(1, 0);
        let placements = planner.plan_region(
            &mut sampler(1),
            &SimplexNoise::new(2),
            &region(1),
            4.0,
            &mut rng,
        );
        assert!(placements.is_empty());
    }

    #[test]
    fn test_same_rng_seed_reproduces_layout() {
        let planner = ObstaclePlanner::new(ObstacleParams::default());
        let points = region(21);
        let a = planner.plan_region(
            &mut sampler(21),
            &SimplexNoise::new(22),
            &points,
            5.0,
            &mut chunk_rng(21, 4),
        );
        let b = planner.plan_region(
            &mut sampler(21),
            &SimplexNoise::new(22),
            &points,
            5.0,
            &mut chunk_rng(21, 4),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_placements_sit_on_terrain_of_their_surface() {
        let only_plateau = ObstacleParams {
            track: SurfaceRules::none(),
            bank: SurfaceRules::none(),
            cliff: SurfaceRules::none(),
            plateau: generous_rules(),
            ..Default::default()
        };
        let planner = ObstaclePlanner::new(only_plateau);
        let points = region(30);
        let mut terrain = sampler(30);
        let placements = planner.plan_region(
            &mut terrain,
            &SimplexNoise::new(31),
            &points,
            4.0,
            &mut chunk_rng(30, 0),
        );

        assert!(!placements.is_empty());
        for p in &placements {
            assert_eq!(p.surface, SurfaceKind::Plateau);
            let pos = p.transform.position;
            let sample = terrain.sample_nearest(&points, pos.x, pos.z).unwrap();
            assert!((sample.height - pos.y).abs() < 1e-9, "Obstacle floats or sinks");
        }
    }

    #[test]
    fn test_tree_scale_clamped() {
        let planner = ObstaclePlanner::new(ObstacleParams {
            capacity: BucketCapacity::uniform(10_000),
            ..all_rules(generous_rules())
        });
        let mut rng = chunk_rng(5, 5);
        let placements = planner.plan_region(
            &mut sampler(5),
            &SimplexNoise::new(6),
            &region(5),
            3.0,
            &mut rng,
        );
        let scale = &planner.params().tree_scales.medium;
        for p in placements {
            if p.kind == ObstacleKind::Tree(TreeSize::Medium) {
                let s = p.transform.scale.x;
                assert!(s >= scale.min && s <= scale.max, "Scale {s} not clamped");
                assert_eq!(p.transform.scale, DVec3::splat(s));
            }
            assert!(p.transform.rotation.is_normalized());
        }
    }

    #[test]
    fn test_track_rule_uses_proportions() {
        let planner = ObstaclePlanner::new(ObstacleParams {
            track: SurfaceRules {
                rarity: 1.0,
                type_proportions: TypeProportions {
                    tree: 1.0,
                    rock: 0.0,
                    dead_tree: 0.0,
                },
                size_proportions: SizeProportions {
                    small: 0.0,
                    medium: 0.0,
                    large: 2.0,
                },
                ..Default::default()
            },
            ..Default::default()
        });
        let mut rng = chunk_rng(0, 0);
        for _ in 0..50 {
            let noise = rng.random::<f64>();
            assert_eq!(
                planner.decide(ObstacleZone::Track, noise, &mut rng),
                Some(ObstacleKind::Tree(TreeSize::Large))
            );
        }
    }

    #[test]
    fn test_track_rule_all_weights_zero() {
        let planner = ObstaclePlanner::new(ObstacleParams {
            track: SurfaceRules {
                rarity: 1.0,
                type_proportions: TypeProportions {
                    tree: 0.0,
                    rock: 0.0,
                    dead_tree: 0.0,
                },
                ..Default::default()
            },
            ..Default::default()
        });
        let mut rng = chunk_rng(0, 1);
        assert_eq!(planner.decide(ObstacleZone::Track, 0.5, &mut rng), None);
    }

    #[test]
    fn test_first_matching_band_wins() {
        let rules = SurfaceRules {
            noise_bands: vec![
                NoiseBand {
                    proportion: 0.0,
                    ..NoiseBand::new(0.0, 1.0, TreeSize::Large, 1.0)
                },
                NoiseBand::new(0.2, 0.6, TreeSize::Small, 1.0),
                NoiseBand::new(0.0, 1.0, TreeSize::Medium, 1.0),
            ],
            rock_fallback: 1.0,
            ..Default::default()
        };
        let planner = ObstaclePlanner::new(all_rules(rules));
        let mut rng = chunk_rng(2, 2);
        assert_eq!(
            planner.decide(ObstacleZone::Bank, 0.4, &mut rng),
            Some(ObstacleKind::Tree(TreeSize::Small)),
            "Disabled band must be skipped, first enabled match wins"
        );
        assert_eq!(
            planner.decide(ObstacleZone::Cliff, 0.8, &mut rng),
            Some(ObstacleKind::Tree(TreeSize::Medium))
        );
    }

    #[test]
    fn test_rock_fallback_when_no_band_matches() {
        let rules = SurfaceRules {
            noise_bands: vec![NoiseBand::new(0.8, 1.0, TreeSize::Small, 1.0)],
            rock_fallback: 1.0,
            ..Default::default()
        };
        let planner = ObstaclePlanner::new(all_rules(rules.clone()));
        let mut rng = chunk_rng(4, 4);
        assert_eq!(
            planner.decide(ObstacleZone::Bank, 0.1, &mut rng),
            Some(ObstacleKind::Rock)
        );

        let no_rocks = ObstaclePlanner::new(all_rules(SurfaceRules {
            rock_fallback: 0.0,
            ..rules
        }));
        assert_eq!(no_rocks.decide(ObstacleZone::Cliff, 0.1, &mut rng), None);
    }

    #[test]
    fn test_plateau_dead_tree_band_first() {
        let plateau = SurfaceRules {
            noise_bands: vec![NoiseBand::new(0.0, 1.0, TreeSize::Large, 1.0)],
            dead_tree_band: Some(DeadTreeBand {
                min: 0.0,
                max: 0.2,
                probability: 1.0,
            }),
            ..Default::default()
        };
        let planner = ObstaclePlanner::new(ObstacleParams {
            plateau,
            ..Default::default()
        });
        let mut rng = chunk_rng(6, 6);
        assert_eq!(
            planner.decide(ObstacleZone::Plateau, 0.1, &mut rng),
            Some(ObstacleKind::DeadTree)
        );
        assert_eq!(
            planner.decide(ObstacleZone::Plateau, 0.5, &mut rng),
            Some(ObstacleKind::Tree(TreeSize::Large))
        );
    }

    #[test]
    fn test_zone_mapping() {
        assert_eq!(ObstacleZone::of(SurfaceKind::Track), ObstacleZone::Track);
        assert_eq!(ObstacleZone::of(SurfaceKind::Bank), ObstacleZone::Bank);
        assert_eq!(ObstacleZone::of(SurfaceKind::CanyonFloor), ObstacleZone::Bank);
        assert_eq!(ObstacleZone::of(SurfaceKind::WallVertical), ObstacleZone::Cliff);
        assert_eq!(ObstacleZone::of(SurfaceKind::WallLedge), ObstacleZone::Cliff);
        assert_eq!(ObstacleZone::of(SurfaceKind::Plateau), ObstacleZone::Plateau);
    }

    #[test]
    fn test_pick_weighted_normalizes() {
        let mut rng = chunk_rng(7, 7);
        let mut hits = [0usize; 2];
        for _ in 0..10_000 {
            match pick_weighted(&mut rng, &[(0usize, 3.0), (1usize, 1.0)]) {
                Some(i) => hits[i] += 1,
                None => panic!("weights are positive"),
            }
        }
        let ratio = hits[0] as f64 / 10_000.0;
        assert!((ratio - 0.75).abs() < 0.03, "Observed ratio {ratio}");
        assert_eq!(pick_weighted::<usize, _>(&mut rng, &[(0, 0.0)]), None);
    }

    #[test]
    fn test_empty_region() {
        let planner = ObstaclePlanner::new(ObstacleParams::default());
        let placements = planner.plan_region(
            &mut sampler(1),
            &SimplexNoise::new(1),
            &[],
            4.0,
            &mut chunk_rng(1, 1),
        );
        assert!(placements.is_empty());
    }
}
