//! Seedable 2D coherent noise.
//!
//! Every shaping step of the corridor (lateral wander, width, moguls, wall
//! displacement, obstacle bands) reads a [`NoiseSource`]. The production
//! source is [`SimplexNoise`]; closures implement the trait too, which keeps
//! tests free of noise-dependent magic numbers.

use noise::{NoiseFn, Simplex};

use crate::seed::{SeedStream, noise_seed};

/// A deterministic, continuous 2D noise function with values in `[-1, 1]`.
pub trait NoiseSource {
    /// Sample the field. Must be pure: identical inputs give identical output.
    fn sample(&self, x: f64, y: f64) -> f64;

    /// Sample remapped to `[0, 1]`.
    fn sample_unit(&self, x: f64, y: f64) -> f64 {
        (self.sample(x, y) + 1.0) * 0.5
    }
}

impl<F> NoiseSource for F
where
    F: Fn(f64, f64) -> f64,
{
    fn sample(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Simplex noise over `f64` coordinates.
///
/// `f64` input keeps the lattice precise for the coordinate range of a ride
/// (tens of kilometres from the origin, negative Z).
#[derive(Clone, Debug)]
pub struct SimplexNoise {
    seed: u32,
    inner: Simplex,
}

impl SimplexNoise {
    /// Create a noise field from a raw 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            inner: Simplex::new(seed),
        }
    }

    /// Create the noise field for one stream of a ride.
    pub fn for_stream(ride_seed: u64, stream: SeedStream) -> Self {
        Self::new(noise_seed(ride_seed, stream))
    }

    /// The seed this field was built from.
    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl NoiseSource for SimplexNoise {
    fn sample(&self, x: f64, y: f64) -> f64 {
        self.inner.get([x, y]).clamp(-1.0, 1.0)
    }
}
