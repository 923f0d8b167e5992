//! PNG export of debug surface maps.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use slope_terrain::debug_viz::DebugImage;

use crate::DemoError;

/// Encode an RGBA debug image as an 8-bit PNG.
pub fn write_png(image: &DebugImage, path: &Path) -> Result<(), DemoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(file, image.width, image.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.pixels)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_has_image_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps").join("surface.png");
        let mut image = DebugImage::new(5, 3);
        image.set_pixel(1, 1, [200, 10, 10, 255]);

        write_png(&image, &path).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 5);
        assert_eq!(reader.info().height, 3);
        assert_eq!(reader.info().color_type, png::ColorType::Rgba);
    }
}
