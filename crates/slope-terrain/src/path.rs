//! Ride centerline ("path spine") generation.
//!
//! The spine is extended one chunk at a time. Each call produces oriented
//! [`PathPoint`]s carrying arc-length and a local forward/right frame; the
//! caller threads a [`TailContext`] from one call to the next so smoothing
//! and arc-length continue seamlessly across chunk boundaries.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::noise_source::NoiseSource;
use crate::seed::{det_atan2, det_cos, det_sin};

/// Row of the noise field used for width variation, far from the lateral row.
const WIDTH_NOISE_ROW: f64 = 71.3;

/// Below this horizontal step length a tangent is considered degenerate.
const MIN_STEP: f64 = 1e-9;

/// Points searched on either side of the Z-nearest candidate.
const NEAREST_NEIGHBOURHOOD: usize = 12;

/// Shape parameters of the ride centerline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathParams {
    /// Distance between consecutive samples along the travel axis.
    pub segment_length: f64,
    /// Amplitude of the noise-driven lateral wander.
    pub amplitude: f64,
    /// Frequency of the lateral noise per unit of travel.
    pub noise_scale: f64,
    /// Frequency of the broad meander.
    pub meander_frequency_a: f64,
    /// Amplitude of the broad meander.
    pub meander_amplitude_a: f64,
    /// Frequency of the tighter meander.
    pub meander_frequency_b: f64,
    /// Amplitude of the tighter meander.
    pub meander_amplitude_b: f64,
    /// Nominal track width.
    pub width_base: f64,
    /// Frequency of the width noise, keyed on world Z.
    pub width_noise_scale: f64,
    /// Fraction by which noise may widen or narrow the track.
    pub width_variation: f64,
    /// Half-sine widening across each chunk (0 disables it).
    pub width_bulge: f64,
    /// Centered moving-average window over the lateral coordinate.
    pub smoothing_window: usize,
    /// Banking angle per radian of heading.
    pub banking_strength: f64,
}

impl Default for PathParams {
    fn default() -> Self {
        Self {
            segment_length: 4.0,
            amplitude: 40.0,
            noise_scale: 0.004,
            meander_frequency_a: 0.0021,
            meander_amplitude_a: 60.0,
            meander_frequency_b: 0.0057,
            meander_amplitude_b: 25.0,
            width_base: 40.0,
            width_noise_scale: 0.003,
            width_variation: 0.25,
            width_bulge: 0.15,
            smoothing_window: 7,
            banking_strength: 0.35,
        }
    }
}

/// One sample of the ride centerline. Immutable once generated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    /// Global sample index (the travel distance is `index * segment_length`).
    pub index: u64,
    /// World position of the centerline.
    pub position: DVec3,
    /// Heading in radians; 0 is straight down the -Z axis, positive turns toward +X.
    pub heading: f64,
    /// Full lateral track width.
    pub width: f64,
    /// Lateral tilt of the track.
    pub banking: f64,
    /// Cumulative arc-length from the start of the ride.
    pub s: f64,
    /// Vertical change per unit of horizontal travel at this point.
    pub grade: f64,
    /// Unit forward vector in the XZ plane (`x`, `z`).
    pub forward: DVec2,
    /// Unit right vector in the XZ plane (`x`, `z`), perpendicular to `forward`.
    pub right: DVec2,
}

impl PathPoint {
    /// Half of the track width.
    pub fn half_width(&self) -> f64 {
        self.width * 0.5
    }

    /// Squared horizontal distance from this point to a world XZ position.
    pub fn horizontal_distance_sq(&self, x: f64, z: f64) -> f64 {
        let dx = x - self.position.x;
        let dz = z - self.position.z;
        dx * dx + dz * dz
    }
}

/// The continuation state handed from one segment generation to the next.
///
/// Holds the last few points of the previous segment (for smoothing and the
/// first tangent) and the arc-length at which the next point continues.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TailContext {
    points: Vec<PathPoint>,
    arc_length: f64,
}

impl TailContext {
    /// Start of a ride: no previous points, arc-length 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// No previous points, but arc-length continues from `arc_length`.
    pub fn starting_at(arc_length: f64) -> Self {
        Self {
            points: Vec::new(),
            arc_length,
        }
    }

    /// Keep the last `keep` points of a generated segment.
    pub fn from_points(points: &[PathPoint], keep: usize) -> Self {
        let start = points.len().saturating_sub(keep);
        let points = points[start..].to_vec();
        let arc_length = points.last().map_or(0.0, |p| p.s);
        Self { points, arc_length }
    }

    /// The carried-over points, oldest first.
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// Arc-length of the last carried point (or the explicit start).
    pub fn arc_length(&self) -> f64 {
        self.arc_length
    }

    /// Returns `true` if no points are carried over.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Builds the centerline from a noise field and [`PathParams`].
///
/// Generation is a pure function of the noise field, the parameters, the
/// requested indices and the tail context.
pub struct PathSpineGenerator<N> {
    params: PathParams,
    noise: N,
}

impl<N: NoiseSource> PathSpineGenerator<N> {
    /// Create a generator.
    pub fn new(params: PathParams, noise: N) -> Self {
        Self { params, noise }
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Raw (unsmoothed) lateral offset at a travel distance.
    pub fn raw_lateral(&self, distance: f64) -> f64 {
        let p = &self.params;
        p.amplitude * self.noise.sample(distance * p.noise_scale, 0.0)
            + p.meander_amplitude_a * det_sin(distance * p.meander_frequency_a)
            + p.meander_amplitude_b * det_sin(distance * p.meander_frequency_b)
    }

    /// Generate `segment_count` points with global indices
    /// `start_index..start_index + segment_count`.
    ///
    /// Altitude starts at `base_altitude` for `start_index` and descends by
    /// `slope_tangent` per unit of travel. One extra raw sample past the end is
    /// computed as smoothing lookahead but not emitted.
    pub fn generate_segment(
        &self,
        start_index: u64,
        segment_count: usize,
        base_altitude: f64,
        slope_tangent: f64,
        tail: &TailContext,
    ) -> Vec<PathPoint> {
        if segment_count == 0 {
            return Vec::new();
        }

        let p = &self.params;
        let step = p.segment_length;
        let tail_points = tail.points();
        let tail_len = tail_points.len();
        let raw_count = segment_count + 1;

        let mut positions: Vec<DVec3> = Vec::with_capacity(tail_len + raw_count);
        positions.extend(tail_points.iter().map(|pt| pt.position));
        for i in 0..raw_count {
            let distance = (start_index + i as u64) as f64 * step;
            positions.push(DVec3::new(
                self.raw_lateral(distance),
                base_altitude - i as f64 * step * slope_tangent,
                -distance,
            ));
        }

        let lateral: Vec<f64> = positions.iter().map(|pos| pos.x).collect();
        let smoothed = centered_moving_average(&lateral, tail_len, p.smoothing_window);
        for (pos, x) in positions[tail_len..].iter_mut().zip(smoothed) {
            pos.x = x;
        }

        let fallback = DVec3::new(0.0, -slope_tangent * step, -step);
        let mut s = tail.arc_length();
        let mut points = Vec::with_capacity(segment_count);

        for k in 0..segment_count {
            let j = tail_len + k;
            let current = positions[j];

            let delta = if j > 0 {
                current - positions[j - 1]
            } else {
                positions[j + 1] - current
            };
            let (delta, degenerate) = tangent_or_fallback(delta, fallback);

            if j > 0 {
                s += if degenerate { step } else { delta.length() };
            }

            let horizontal = DVec2::new(delta.x, delta.z).length();
            let heading = det_atan2(delta.x, -delta.z);
            let forward = DVec2::new(det_sin(heading), -det_cos(heading));
            let right = DVec2::new(det_cos(heading), det_sin(heading));

            let progress = k as f64 / segment_count as f64;
            let progress_factor = 1.0 + p.width_bulge * det_sin(std::f64::consts::PI * progress);
            let width_noise = self
                .noise
                .sample(WIDTH_NOISE_ROW, current.z * p.width_noise_scale);
            let width = p.width_base * (1.0 + width_noise * p.width_variation) * progress_factor;

            points.push(PathPoint {
                index: start_index + k as u64,
                position: current,
                heading,
                width,
                banking: heading * p.banking_strength,
                s,
                grade: delta.y / horizontal,
                forward,
                right,
            });
        }

        points
    }
}

/// Replace a step whose horizontal extent vanishes by the default step.
///
/// Returns the usable delta and whether the fallback was taken.
fn tangent_or_fallback(delta: DVec3, fallback: DVec3) -> (DVec3, bool) {
    if DVec2::new(delta.x, delta.z).length() < MIN_STEP {
        (fallback, true)
    } else {
        (delta, false)
    }
}

/// Centered moving average of `values[from..]`, reading neighbours from the
/// whole slice. The window clamps at both ends of the slice.
fn centered_moving_average(values: &[f64], from: usize, window: usize) -> Vec<f64> {
    if window <= 1 {
        return values[from..].to_vec();
    }
    let half = window / 2;
    let last = values.len() - 1;
    (from..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(last);
            let sum: f64 = values[lo..=hi].iter().sum();
            sum / (hi - lo + 1) as f64
        })
        .collect()
}

/// Find the path point closest (in XZ) to a world position.
///
/// Relies on the ride's Z decreasing strictly with the point index: a binary
/// search finds the Z-nearest candidate, then a small neighbourhood is scanned.
pub fn nearest_path_point(points: &[PathPoint], x: f64, z: f64) -> Option<&PathPoint> {
    if points.is_empty() {
        return None;
    }
    let pivot = points.partition_point(|p| p.position.z > z);
    let lo = pivot.saturating_sub(NEAREST_NEIGHBOURHOOD);
    let hi = (pivot + NEAREST_NEIGHBOURHOOD).min(points.len());
    points[lo..hi].iter().min_by(|a, b| {
        a.horizontal_distance_sq(x, z)
            .total_cmp(&b.horizontal_distance_sq(x, z))
    })
}
