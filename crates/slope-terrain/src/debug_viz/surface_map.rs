//! Surface-kind colouring of sample lattices.

use super::image::DebugImage;
use crate::sampler::TerrainSample;
use crate::surface::SurfaceKind;

/// Base colour of a surface kind.
pub fn surface_color(kind: SurfaceKind) -> [u8; 3] {
    match kind {
        SurfaceKind::Track => [235, 240, 250],
        SurfaceKind::Bank => [170, 200, 235],
        SurfaceKind::CanyonFloor => [120, 160, 120],
        SurfaceKind::WallVertical => [110, 90, 80],
        SurfaceKind::WallLedge => [175, 150, 120],
        SurfaceKind::Plateau => [60, 110, 70],
    }
}

/// Darken `rgb` for low terrain: `level` 0 maps to 55% brightness, 1 to 100%.
pub fn shade(rgb: [u8; 3], level: f64) -> [u8; 3] {
    let factor = 0.55 + 0.45 * level.clamp(0.0, 1.0);
    rgb.map(|c| (c as f64 * factor).round().clamp(0.0, 255.0) as u8)
}

/// Render a row-major lattice of `columns × rows` samples, one pixel each.
///
/// Heights are normalized over the lattice. Missing samples (a short slice)
/// stay transparent.
pub fn render_surface_map(samples: &[TerrainSample], columns: u32, rows: u32) -> DebugImage {
    let mut image = DebugImage::new(columns, rows);
    let (lo, hi) = samples
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), s| (lo.min(s.height), hi.max(s.height)));
    let range = hi - lo;

    for (i, sample) in samples.iter().enumerate().take(columns as usize * rows as usize) {
        let x = (i % columns as usize) as u32;
        let y = (i / columns as usize) as u32;
        let level = if range > 0.0 {
            (sample.height - lo) / range
        } else {
            1.0
        };
        let [r, g, b] = shade(surface_color(sample.kind), level);
        image.set_pixel(x, y, [r, g, b, 255]);
    }
    image
}
