//! Deterministic detection/recognition backend
//!
//! Reports a fixed list of regions and answers recognition requests by
//! matching the crop's source bounds against that list, so results do not
//! depend on the order in which concurrent region tasks run. Used in tests
//! and demos in place of Tesseract.

use crate::config::RecognitionOptions;
use crate::error::{PipelineError, Result};
use crate::ocr::{RegionCrop, TextRecognizer};
use crate::segment::RegionDetector;
use crate::types::{NormalizedRect, PixelRect};
use image::GrayImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Bounds within this many pixels are considered the same region
const MATCH_TOLERANCE: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct ScriptedRegion {
    /// Region in top-left pixel coordinates
    pub bounds: PixelRect,
    /// Recognized text (lines separated by `\n`); `None` makes OCR fail
    pub text: Option<String>,
    /// How long recognition blocks before answering
    pub delay: Duration,
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    regions: Vec<ScriptedRegion>,
    fail_detection: bool,
    recognitions: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region that recognizes as `text`
    pub fn region(self, bounds: PixelRect, text: &str) -> Self {
        self.region_with_delay(bounds, text, Duration::ZERO)
    }

    /// Add a region whose recognition takes `delay`
    pub fn region_with_delay(mut self, bounds: PixelRect, text: &str, delay: Duration) -> Self {
        self.regions.push(ScriptedRegion {
            bounds,
            text: Some(text.to_string()),
            delay,
        });
        self
    }

    /// Add a region whose recognition fails
    pub fn failing_region(mut self, bounds: PixelRect) -> Self {
        self.regions.push(ScriptedRegion {
            bounds,
            text: None,
            delay: Duration::ZERO,
        });
        self
    }

    /// Make region detection fail
    pub fn failing_detection(mut self) -> Self {
        self.fail_detection = true;
        self
    }

    /// Number of recognition calls served so far
    pub fn recognition_count(&self) -> usize {
        self.recognitions.load(Ordering::SeqCst)
    }

    fn lookup(&self, bounds: &PixelRect) -> Option<&ScriptedRegion> {
        self.regions.iter().find(|r| {
            (r.bounds.x - bounds.x).abs() <= MATCH_TOLERANCE
                && (r.bounds.y - bounds.y).abs() <= MATCH_TOLERANCE
                && (r.bounds.width - bounds.width).abs() <= MATCH_TOLERANCE
                && (r.bounds.height - bounds.height).abs() <= MATCH_TOLERANCE
        })
    }
}

impl RegionDetector for ScriptedBackend {
    fn detect_regions(&self, image: &GrayImage) -> Result<Vec<NormalizedRect>> {
        if self.fail_detection {
            return Err(PipelineError::Detect("scripted detection failure".to_string()));
        }
        let (width, height) = image.dimensions();
        Ok(self
            .regions
            .iter()
            .map(|r| NormalizedRect::from_pixel_rect(&r.bounds, width, height))
            .collect())
    }
}

impl TextRecognizer for ScriptedBackend {
    fn recognize_text(
        &self,
        crop: &RegionCrop,
        _options: &RecognitionOptions,
    ) -> Result<Vec<String>> {
        self.recognitions.fetch_add(1, Ordering::SeqCst);

        let region = self.lookup(&crop.bounds).ok_or_else(|| {
            PipelineError::Recognize(format!("no scripted region at {:?}", crop.bounds))
        })?;

        if !region.delay.is_zero() {
            std::thread::sleep(region.delay);
        }

        match &region.text {
            Some(text) => Ok(text.lines().map(str::to_string).collect()),
            None => Err(PipelineError::Recognize("scripted recognition failure".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::extract_number;
    use crate::segment::segment_regions;

    #[test]
    fn test_scripted_backend_round_trips_regions() {
        let img = GrayImage::new(120, 80);
        let backend = ScriptedBackend::new()
            .region(PixelRect::new(10.0, 10.0, 20.0, 10.0), "12")
            .region(PixelRect::new(50.0, 40.0, 30.0, 12.0), "x");

        let regions = segment_regions(&img, &backend);
        assert_eq!(regions.len(), 2);

        let options = RecognitionOptions::default();
        let numbers: Vec<i32> = regions
            .iter()
            .filter_map(|r| extract_number(&img, r, &backend, &options))
            .map(|n| n.value)
            .collect();

        assert_eq!(numbers, vec![12]);
        assert_eq!(backend.recognition_count(), 2);
    }

    #[test]
    fn test_scripted_detection_failure() {
        let img = GrayImage::new(10, 10);
        let backend = ScriptedBackend::new()
            .region(PixelRect::new(0.0, 0.0, 5.0, 5.0), "1")
            .failing_detection();
        assert!(segment_regions(&img, &backend).is_empty());
    }

    #[test]
    fn test_scripted_recognition_failure() {
        let img = GrayImage::new(40, 40);
        let bounds = PixelRect::new(5.0, 5.0, 10.0, 10.0);
        let backend = ScriptedBackend::new().failing_region(bounds);
        let options = RecognitionOptions::default();
        assert!(extract_number(&img, &bounds, &backend, &options).is_none());
    }
}
