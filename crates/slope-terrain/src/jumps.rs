//! Arc-length-indexed jump ramp schedule.
//!
//! Jumps are generated lazily ahead of the queried arc-length. Every ramp's
//! parameters come from an RNG seeded by its ordinal, so the schedule is the
//! same however far ahead (or in what order) it gets extended.

use serde::{Deserialize, Serialize};

use crate::seed::{SeedStream, ordinal_rng, sample_normal, sample_range, smoothstep, smoothstep_range};

/// Fraction of the ramp taken by the rising face; the rest is the lip.
const FACE_SPLIT: f64 = 0.7;

/// Fraction of the full height reached at the end of the rising face.
const FACE_HEIGHT_SHARE: f64 = 0.6;

/// Jump schedule parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JumpParams {
    /// Mean arc-length between consecutive jump starts.
    pub distance_mean: f64,
    /// Standard deviation of the spacing.
    pub distance_stddev: f64,
    /// Minimum spacing between jump starts.
    pub min_spacing: f64,
    /// Maximum spacing between jump starts; also the scheduling lookahead.
    pub max_spacing: f64,
    /// Arc-length before which no jump spacing is counted.
    pub first_offset: f64,
    /// Ramp length range.
    pub length_range: (f64, f64),
    /// Ramp height range.
    pub height_range: (f64, f64),
    /// Range of the band half-width as a fraction of the half track width.
    pub band_fraction_range: (f64, f64),
    /// Fraction of the band half-width over which the jump fades out laterally.
    pub band_edge_softness: f64,
}

impl Default for JumpParams {
    fn default() -> Self {
        Self {
            distance_mean: 180.0,
            distance_stddev: 50.0,
            min_spacing: 90.0,
            max_spacing: 320.0,
            first_offset: 60.0,
            length_range: (8.0, 16.0),
            height_range: (1.5, 4.0),
            band_fraction_range: (0.3, 0.5),
            band_edge_softness: 0.4,
        }
    }
}

/// One scheduled ramp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpRamp {
    /// Arc-length where the ramp starts.
    pub start: f64,
    /// Ramp length along the path.
    pub length: f64,
    /// Height at the lip.
    pub height: f64,
    /// Lateral centre in `[-1, 1]`, relative to the room the band has inside the track.
    pub center: f64,
    /// Band half-width as a fraction of the half track width.
    pub band_fraction: f64,
}

impl JumpRamp {
    /// Arc-length where the ramp ends (the lip).
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    /// Returns `true` if `s` lies on the ramp, endpoints included.
    pub fn contains(&self, s: f64) -> bool {
        s >= self.start && s <= self.end()
    }

    /// Band centre offset and half-width in world units for a track half width.
    pub fn band(&self, half_track: f64) -> (f64, f64) {
        let half_band = self.band_fraction * half_track;
        let center = self.center * (half_track - half_band).max(0.0);
        (center, half_band)
    }

    /// Lateral weight in `[0, 1]` of this ramp at offset `t`.
    pub fn lateral_weight(&self, t: f64, half_track: f64, softness: f64) -> f64 {
        let (center, half_band) = self.band(half_track);
        let inner = half_band * (1.0 - softness.clamp(0.0, 1.0));
        1.0 - smoothstep_range(inner, half_band, (t - center).abs())
    }
}

/// Height of a ramp of unit height at progress `p ∈ [0, 1]`.
///
/// Smoothstep ease-in over the face, cubic ease-out over the lip.
pub fn ramp_profile(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    if p <= FACE_SPLIT {
        FACE_HEIGHT_SHARE * smoothstep(p / FACE_SPLIT)
    } else {
        let q = (p - FACE_SPLIT) / (1.0 - FACE_SPLIT);
        let inv = 1.0 - q;
        FACE_HEIGHT_SHARE + (1.0 - FACE_HEIGHT_SHARE) * (1.0 - inv * inv * inv)
    }
}

/// Result of a jump lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpOffset {
    /// Vertical offset at the queried arc-length, before lateral banding.
    pub offset: f64,
    /// Ordinal of the containing ramp, if any.
    pub index: Option<usize>,
    /// Start of the containing ramp (0 when none).
    pub start: f64,
    /// Length of the containing ramp (0 when none).
    pub length: f64,
}

impl JumpOffset {
    const NONE: Self = Self {
        offset: 0.0,
        index: None,
        start: 0.0,
        length: 0.0,
    };
}

/// Append-only jump schedule with a forward-biased lookup cursor.
#[derive(Clone, Debug)]
pub struct JumpScheduler {
    params: JumpParams,
    seed: u64,
    ramps: Vec<JumpRamp>,
    cursor: usize,
}

impl JumpScheduler {
    /// Create an empty schedule for a ride seed.
    pub fn new(params: JumpParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            ramps: Vec::new(),
            cursor: 0,
        }
    }

    /// Return a reference to the schedule parameters.
    pub fn params(&self) -> &JumpParams {
        &self.params
    }

    /// All ramps scheduled so far, ordered by start.
    pub fn ramps(&self) -> &[JumpRamp] {
        &self.ramps
    }

    /// Ramps overlapping the arc-length interval `[from, to]`.
    pub fn ramps_between(&self, from: f64, to: f64) -> impl Iterator<Item = &JumpRamp> {
        self.ramps
            .iter()
            .filter(move |r| r.end() >= from && r.start <= to)
    }

    /// Extend the schedule until the last ramp starts at or beyond `s + max_spacing`.
    pub fn ensure_coverage(&mut self, s: f64) {
        let horizon = s + self.params.max_spacing;
        let before = self.ramps.len();
        while self.ramps.last().is_none_or(|r| r.start < horizon) {
            let ordinal = self.ramps.len();
            let previous_start = self
                .ramps
                .last()
                .map_or(self.params.first_offset, |r| r.start);
            let ramp = self.roll_ramp(ordinal as u64, previous_start);
            self.ramps.push(ramp);
        }
        if self.ramps.len() > before {
            tracing::debug!(
                added = self.ramps.len() - before,
                total = self.ramps.len(),
                horizon,
                "extended jump schedule"
            );
        }
    }

    fn roll_ramp(&self, ordinal: u64, previous_start: f64) -> JumpRamp {
        let p = &self.params;
        let mut rng = ordinal_rng(self.seed, SeedStream::Jumps, ordinal);
        let spacing = sample_normal(&mut rng, p.distance_mean, p.distance_stddev)
            .clamp(p.min_spacing, p.max_spacing.max(p.min_spacing));
        JumpRamp {
            start: previous_start + spacing,
            length: sample_range(&mut rng, p.length_range),
            height: sample_range(&mut rng, p.height_range),
            center: sample_range(&mut rng, (-1.0, 1.0)),
            band_fraction: sample_range(&mut rng, p.band_fraction_range),
        }
    }

    /// Vertical jump offset at arc-length `s`, ignoring lateral banding.
    pub fn height_offset_at(&mut self, s: f64) -> JumpOffset {
        self.ensure_coverage(s);
        let last = self.ramps.len() - 1;
        self.cursor = self.cursor.min(last);

        while self.cursor < last && s > self.ramps[self.cursor].end() {
            self.cursor += 1;
        }
        while self.cursor > 0 && s < self.ramps[self.cursor].start {
            self.cursor -= 1;
        }
        tracing::trace!(s, cursor = self.cursor, "jump lookup");

        let ramp = self.ramps[self.cursor];
        if !ramp.contains(s) {
            return JumpOffset::NONE;
        }
        let progress = if ramp.length > 0.0 {
            (s - ramp.start) / ramp.length
        } else {
            1.0
        };
        JumpOffset {
            offset: ramp.height * ramp_profile(progress),
            index: Some(self.cursor),
            start: ramp.start,
            length: ramp.length,
        }
    }

    /// Jump offset at `(s, t)` including the lateral band falloff.
    ///
    /// Outside the ramp's band the lookup reports no ramp at all.
    pub fn banded_offset_at(&mut self, s: f64, t: f64, half_track: f64) -> JumpOffset {
        let mut lookup = self.height_offset_at(s);
        if let Some(index) = lookup.index {
            let weight =
                self.ramps[index].lateral_weight(t, half_track, self.params.band_edge_softness);
            if weight <= 0.0 {
                return JumpOffset::NONE;
            }
            lookup.offset *= weight;
        }
        lookup
    }
}
