//! Deterministic seeded generation utilities.
//!
//! Provides per-jump and per-chunk RNG derivation from a ride seed,
//! deterministic math functions via `libm`, the Box–Muller normal sampler
//! and the smoothstep easing used throughout terrain shaping.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

/// Independent random streams derived from one ride seed.
///
/// Each stream gets its own derived seed so that, e.g., extending the jump
/// schedule never perturbs obstacle placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeedStream {
    /// Lateral path wander and track width.
    Path,
    /// Moguls, wall displacement and plateau roughness.
    Terrain,
    /// Obstacle noise bands.
    Scatter,
    /// Jump schedule.
    Jumps,
    /// Obstacle decisions and transforms.
    Obstacles,
}

/// Derive a u64 seed for one stream and ordinal from the ride seed.
///
/// Uses SipHash (via std's `DefaultHasher`) to combine the inputs into a
/// well-distributed u64.
pub fn derive_seed(ride_seed: u64, stream: SeedStream, ordinal: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    ride_seed.hash(&mut hasher);
    stream.hash(&mut hasher);
    ordinal.hash(&mut hasher);
    hasher.finish()
}

/// Seed for a noise channel. `noise` seeds are 32-bit, so the derived seed is folded.
pub fn noise_seed(ride_seed: u64, stream: SeedStream) -> u32 {
    let seed = derive_seed(ride_seed, stream, 0);
    (seed ^ (seed >> 32)) as u32
}

/// Deterministic RNG for one element of an ordinal-indexed sequence
/// (jump number, chunk number, ...).
///
/// The same `(ride_seed, stream, ordinal)` always yields the same sequence,
/// regardless of how many other ordinals were drawn before it.
pub fn ordinal_rng(ride_seed: u64, stream: SeedStream, ordinal: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_seed(ride_seed, stream, ordinal))
}

/// Deterministic RNG for obstacle planning in one chunk.
pub fn chunk_rng(ride_seed: u64, chunk_index: u64) -> ChaCha8Rng {
    ordinal_rng(ride_seed, SeedStream::Obstacles, chunk_index)
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

/// Draw from a normal distribution with the Box–Muller transform.
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // u1 must be non-zero for the logarithm.
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    let z = det_sqrt(-2.0 * libm::log(u1)) * det_cos(std::f64::consts::TAU * u2);
    mean + z * std_dev
}

/// Draw uniformly from `[min, max]`. A collapsed range returns `min`.
pub fn sample_range<R: Rng + ?Sized>(rng: &mut R, (min, max): (f64, f64)) -> f64 {
    if max <= min {
        return min;
    }
    min + rng.random::<f64>() * (max - min)
}

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

/// The cubic ease `3p² − 2p³`, with `p` clamped to `[0, 1]`.
#[inline]
pub fn smoothstep(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    p * p * (3.0 - 2.0 * p)
}

/// Smoothstep of `x` between two edges. Degenerate edges act as a hard step.
#[inline]
pub fn smoothstep_range(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    smoothstep((x - edge0) / (edge1 - edge0))
}

// ---------------------------------------------------------------------------
// Deterministic math (libm)
// ---------------------------------------------------------------------------

/// Deterministic sine using libm (not platform libc).
#[inline]
pub fn det_sin(x: f64) -> f64 {
    libm::sin(x)
}

/// Deterministic cosine using libm.
#[inline]
pub fn det_cos(x: f64) -> f64 {
    libm::cos(x)
}

/// Deterministic atan2 using libm.
#[inline]
pub fn det_atan2(y: f64, x: f64) -> f64 {
    libm::atan2(y, x)
}

/// Deterministic sqrt using libm.
#[inline]
pub fn det_sqrt(x: f64) -> f64 {
    libm::sqrt(x)
}
