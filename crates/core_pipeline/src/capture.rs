//! Image acquisition
//!
//! Turns camera bytes or a library file into a decoded image. Missing or
//! undecodable data is reported as [`PipelineError::Decode`]; the session
//! controller treats that as an aborted capture.

use crate::error::{PipelineError, Result};
use image::DynamicImage;
use std::path::Path;

/// Where a captured image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    #[default]
    Camera,
    PhotoLibrary,
}

/// Decode encoded image bytes (PNG, JPEG, ...)
pub fn decode_capture(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(PipelineError::Decode("no image data".to_string()));
    }

    let image =
        image::load_from_memory(bytes).map_err(|e| PipelineError::Decode(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::Decode("image has no pixels".to_string()));
    }

    Ok(image)
}

/// Load an image file from disk
pub fn load_capture(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| PipelineError::Decode(format!("{}: {}", path.display(), e)))?;
    decode_capture(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_decode_capture_rejects_empty() {
        let result = decode_capture(&[]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_decode_capture_rejects_garbage() {
        let result = decode_capture(b"definitely not an image");
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_load_capture_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.png");
        let img = ImageBuffer::from_pixel(12, 7, Rgb([20u8, 40u8, 60u8]));
        img.save(&path).unwrap();

        let loaded = load_capture(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (12, 7));
    }

    #[test]
    fn test_load_capture_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_capture(&dir.path().join("missing.png"));
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("missing.png"));
    }
}
