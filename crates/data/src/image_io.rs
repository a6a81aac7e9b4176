//! Grayscale PNG artifacts.

use std::path::Path;

use image::GrayImage;
use ndarray::ArrayView1;

use grad_leak_core::{LeakError, Result, Scalar};

/// Save a flattened image with pixels in `[0, 1]` as an 8-bit grayscale PNG.
///
/// Pixels outside `[0, 1]` are clamped before quantization.
pub fn save_grayscale_png(
    path: &Path,
    pixels: ArrayView1<'_, Scalar>,
    rows: usize,
    cols: usize,
) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(LeakError::invalid("image dimensions must be positive"));
    }
    if pixels.len() != rows * cols {
        return Err(LeakError::shape(
            format!("{} pixels", rows * cols),
            format!("{} pixels", pixels.len()),
        ));
    }

    let bytes: Vec<u8> = pixels
        .iter()
        .map(|&p| ((p as f64).clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    let img = GrayImage::from_raw(cols as u32, rows as u32, bytes)
        .ok_or_else(|| LeakError::image("pixel buffer does not match dimensions"))?;
    img.save(path).map_err(|e| LeakError::image(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::path::PathBuf;

    fn scratch_png(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("grad-leak-png-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(format!("{name}.png"))
    }

    #[test]
    fn writes_and_reads_back_pixels() {
        let path = scratch_png("roundtrip");
        let pixels = array![0.0, 1.0, 0.5, 0.25];
        save_grayscale_png(&path, pixels.view(), 2, 2).unwrap();

        let decoded = image::open(&path).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(0, 0).0[0], 0);
        assert_eq!(decoded.get_pixel(1, 0).0[0], 255);
        assert_eq!(decoded.get_pixel(0, 1).0[0], 128);
        assert_eq!(decoded.get_pixel(1, 1).0[0], 64);
    }

    #[test]
    fn clamps_out_of_range_pixels() {
        let path = scratch_png("clamped");
        let pixels = array![-0.5, 1.5, 0.0, 1.0];
        save_grayscale_png(&path, pixels.view(), 2, 2).unwrap();

        let decoded = image::open(&path).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(0, 0).0[0], 0);
        assert_eq!(decoded.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn rejects_length_mismatch() {
        let path = scratch_png("mismatch");
        let pixels = array![0.0, 1.0, 0.5];
        assert!(save_grayscale_png(&path, pixels.view(), 2, 2).is_err());
    }

    #[test]
    fn rejects_zero_dimensions() {
        let path = scratch_png("zero");
        let pixels = array![0.0];
        assert!(save_grayscale_png(&path, pixels.view(), 0, 1).is_err());
    }
}
