//! Image preprocessing module
//!
//! Normalizes a captured scoreboard photo before detection:
//! - Grayscale (mono) conversion
//! - Brightness offset
//! - Contrast adjustment around mid-grey
//!
//! Also computes SHA-256 digests of snapshots for the history view.

use crate::config::PreprocessConfig;
use crate::error::{PipelineError, Result};
use image::{DynamicImage, GrayImage, Luma};
use sha2::{Digest, Sha256};

/// Preprocess a captured image for detection and OCR
pub fn preprocess_image(input: &DynamicImage, config: &PreprocessConfig) -> Result<GrayImage> {
    if input.width() == 0 || input.height() == 0 {
        return Err(PipelineError::Preprocess(format!(
            "image has no pixels ({}x{})",
            input.width(),
            input.height()
        )));
    }

    // Convert to grayscale
    let gray = input.to_luma8();

    apply_color_controls(&gray, config)
}

/// Preprocess, falling back to the untouched input if any filter fails
pub fn preprocess_or_original(input: &DynamicImage, config: &PreprocessConfig) -> DynamicImage {
    match preprocess_image(input, config) {
        Ok(gray) => DynamicImage::ImageLuma8(gray),
        Err(e) => {
            tracing::debug!("Preprocessing failed, using original image: {}", e);
            input.clone()
        }
    }
}

/// Apply brightness then contrast to a grayscale image
///
/// Intensities are treated on a unit scale: `v' = (v + brightness - 0.5) *
/// contrast + 0.5`, clamped to `[0, 1]`.
pub fn apply_color_controls(input: &GrayImage, config: &PreprocessConfig) -> Result<GrayImage> {
    if !config.contrast.is_finite() || config.contrast < 0.0 {
        return Err(PipelineError::Preprocess(format!(
            "contrast must be a non-negative number, got {}",
            config.contrast
        )));
    }
    if !config.brightness.is_finite() {
        return Err(PipelineError::Preprocess(format!(
            "brightness must be finite, got {}",
            config.brightness
        )));
    }

    let lut = color_controls_lut(config);
    let output = GrayImage::from_fn(input.width(), input.height(), |x, y| {
        Luma([lut[input.get_pixel(x, y)[0] as usize]])
    });

    Ok(output)
}

fn color_controls_lut(config: &PreprocessConfig) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let v = value as f32 / 255.0 + config.brightness;
        let v = (v - 0.5) * config.contrast + 0.5;
        *slot = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    lut
}

/// Compute SHA-256 hash of an image's raw pixel data
///
/// Returns a 64-character hexadecimal string.
pub fn compute_image_hash(image: &DynamicImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_preprocess_basic() {
        let img = ImageBuffer::from_pixel(100, 100, Rgb([255u8, 255u8, 255u8]));
        let dynamic = DynamicImage::ImageRgb8(img);

        let result = preprocess_image(&dynamic, &PreprocessConfig::default());
        assert!(result.is_ok());
        let gray = result.unwrap();
        assert_eq!(gray.dimensions(), (100, 100));
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_color_controls_default_constants() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([128]));
        img.put_pixel(2, 0, Luma([255]));

        let out = apply_color_controls(&img, &PreprocessConfig::default()).unwrap();

        // (0.0 + 0.1 - 0.5) * 1.2 + 0.5 = 0.02
        assert_eq!(out.get_pixel(0, 0)[0], 5);
        // Mid-grey brightens
        assert!(out.get_pixel(1, 0)[0] > 150);
        // White saturates
        assert_eq!(out.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_identity_controls_keep_pixels() {
        let img = ImageBuffer::from_fn(16, 16, |x, y| Luma([(x * 16 + y) as u8]));
        let config = PreprocessConfig {
            contrast: 1.0,
            brightness: 0.0,
        };
        let out = apply_color_controls(&img, &config).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_preprocess_falls_back_to_original() {
        let img = ImageBuffer::from_pixel(4, 4, Rgb([10u8, 200u8, 30u8]));
        let dynamic = DynamicImage::ImageRgb8(img);
        let config = PreprocessConfig {
            contrast: f32::NAN,
            brightness: 0.1,
        };

        let out = preprocess_or_original(&dynamic, &config);
        assert_eq!(out, dynamic);
    }

    #[test]
    fn test_preprocess_rejects_empty_image() {
        let dynamic = DynamicImage::new_luma8(0, 0);
        let result = preprocess_image(&dynamic, &PreprocessConfig::default());
        assert!(matches!(result, Err(PipelineError::Preprocess(_))));
    }

    #[test]
    fn test_preprocess_output_is_grayscale() {
        let img = ImageBuffer::from_pixel(8, 8, Rgb([200u8, 10u8, 10u8]));
        let out = preprocess_or_original(&DynamicImage::ImageRgb8(img), &PreprocessConfig::default());
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_compute_image_hash_deterministic() {
        let img1 = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb([128u8, 128, 128])));
        let img2 = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb([128u8, 128, 128])));

        let hash1 = compute_image_hash(&img1);
        let hash2 = compute_image_hash(&img2);

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex chars
    }

    #[test]
    fn test_compute_image_hash_different_for_different_images() {
        let img1 = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb([128u8, 128, 128])));
        let img2 = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb([64u8, 64, 64])));

        assert_ne!(compute_image_hash(&img1), compute_image_hash(&img2));
    }
}
