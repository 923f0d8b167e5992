//! Debug surface maps: top-down images of sampled corridor lattices.
//!
//! A lattice from [`RideSession::sample_grid`](crate::ride::RideSession::sample_grid)
//! is drawn one pixel per sample, coloured by [`SurfaceKind`] and shaded by
//! height, which makes misclassified bands and terrace seams easy to spot.

mod image;
mod surface_map;

pub use self::image::DebugImage;
pub use surface_map::{render_surface_map, shade, surface_color};

use crate::sampler::TerrainSample;
use crate::surface::SurfaceKind;

/// Share of each surface kind in a lattice, in [`SurfaceKind::ALL`] order.
pub fn surface_histogram(samples: &[TerrainSample]) -> [(SurfaceKind, usize); 6] {
    SurfaceKind::ALL.map(|kind| (kind, samples.iter().filter(|s| s.kind == kind).count()))
}
