//! Receipt image cleanup before OCR.
//!
//! The steps are fixed and order-sensitive: grayscale, then a 3×3 median
//! filter to knock out speckle, then a contrast boost.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use crate::prelude::*;

/// How much we stretch pixel values away from the mean luminance.
pub const CONTRAST_FACTOR: f32 = 2.0;

/// Decode an image and run our cleanup steps on it.
#[instrument(level = "debug", skip_all, fields(bytes = data.len()))]
pub fn preprocess_image(data: &[u8]) -> Result<GrayImage> {
    let image = image::load_from_memory(data).context("cannot decode receipt image")?;
    debug!(width = image.width(), height = image.height(), "Decoded receipt image");
    let gray = image.to_luma8();
    let denoised = median_filter_3x3(&gray);
    Ok(enhance_contrast(&denoised, CONTRAST_FACTOR))
}

/// Decode, clean up and re-encode an image as PNG, for OCR engines that read
/// files.
pub fn preprocess_to_png(data: &[u8]) -> Result<Vec<u8>> {
    let processed = DynamicImage::ImageLuma8(preprocess_image(data)?);
    let mut png = Cursor::new(Vec::new());
    processed
        .write_to(&mut png, ImageFormat::Png)
        .context("cannot encode preprocessed receipt as PNG")?;
    Ok(png.into_inner())
}

/// Replace each pixel with the median of its 3×3 neighborhood. Pixels past
/// the edge are clamped to the nearest edge pixel.
fn median_filter_3x3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut output = GrayImage::new(width, height);
    let mut window = [0u8; 9];
    for y in 0..height {
        for x in 0..width {
            let mut i = 0;
            for dy in [-1i64, 0, 1] {
                for dx in [-1i64, 0, 1] {
                    let nx = (i64::from(x) + dx).clamp(0, i64::from(width) - 1) as u32;
                    let ny = (i64::from(y) + dy).clamp(0, i64::from(height) - 1) as u32;
                    window[i] = image.get_pixel(nx, ny)[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            output.put_pixel(x, y, Luma([window[4]]));
        }
    }
    output
}

/// Blend each pixel away from the mean luminance by `factor`. A factor of
/// 1.0 leaves the image unchanged.
fn enhance_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return image.clone();
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p[0])).sum();
    let mean = (sum as f32 / pixel_count as f32).round();

    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let value = mean + factor * (f32::from(pixel[0]) - mean);
        pixel[0] = value.round().clamp(0.0, 255.0) as u8;
    }
    output
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn median_filter_removes_isolated_speckle() {
        let mut image = GrayImage::from_pixel(5, 5, Luma([200]));
        image.put_pixel(2, 2, Luma([0]));
        let filtered = median_filter_3x3(&image);
        assert_eq!(filtered.get_pixel(2, 2)[0], 200);
        assert_eq!(filtered.get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn contrast_moves_pixels_away_from_mean() {
        let mut image = GrayImage::from_pixel(2, 1, Luma([100]));
        image.put_pixel(1, 0, Luma([140]));
        // Mean is 120, so the pixels move to 80 and 160.
        let enhanced = enhance_contrast(&image, 2.0);
        assert_eq!(enhanced.get_pixel(0, 0)[0], 80);
        assert_eq!(enhanced.get_pixel(1, 0)[0], 160);

        let unchanged = enhance_contrast(&image, 1.0);
        assert_eq!(unchanged, image);
    }

    #[test]
    fn preprocessing_produces_a_grayscale_png() {
        let rgb = RgbImage::from_pixel(8, 4, Rgb([250, 250, 250]));
        let mut encoded = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut encoded, ImageFormat::Png)
            .unwrap();

        let png = preprocess_to_png(encoded.get_ref()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn undecodable_images_are_errors() {
        assert!(preprocess_image(b"definitely not an image").is_err());
    }
}
