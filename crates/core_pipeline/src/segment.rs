//! Region segmentation module
//!
//! Finds candidate text regions in a preprocessed scoreboard image.
//! Detectors report rectangles in their native space (unit square,
//! bottom-left origin); [`segment_regions`] converts them to top-left
//! pixel rectangles and swallows detector failures.

use crate::config::DetectionConfig;
use crate::error::{PipelineError, Result};
use crate::types::{NormalizedRect, PixelRect};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

/// Text-region detection capability
pub trait RegionDetector: Send + Sync {
    /// Detect candidate text regions, in detector-native coordinates
    fn detect_regions(&self, image: &GrayImage) -> Result<Vec<NormalizedRect>>;
}

/// Detect regions and convert them to pixel space
///
/// Returns an empty list if the detector fails. Rectangles are clamped to
/// the image; rectangles left with no area are dropped.
pub fn segment_regions(image: &GrayImage, detector: &dyn RegionDetector) -> Vec<PixelRect> {
    let (width, height) = image.dimensions();

    let detected = match detector.detect_regions(image) {
        Ok(regions) => regions,
        Err(e) => {
            tracing::debug!("Region detection failed: {}", e);
            return Vec::new();
        }
    };

    let regions: Vec<PixelRect> = detected
        .iter()
        .map(|r| r.to_pixel_rect(width, height).clamp_to(width, height))
        .filter(|r| !r.is_empty())
        .collect();

    tracing::debug!(
        "Segmented {} regions ({} reported by detector)",
        regions.len(),
        detected.len()
    );

    regions
}

/// Classical detector: threshold, dilate, take outer contours
#[derive(Debug, Clone, Default)]
pub struct ContourDetector {
    config: DetectionConfig,
}

impl ContourDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Binary mask with text pixels set to 255
    ///
    /// Text is taken to be the minority side of the Otsu split, so both
    /// dark-on-light and light-on-dark boards work.
    fn text_mask(&self, image: &GrayImage) -> GrayImage {
        let level = otsu_level(image);
        let dark = image.pixels().filter(|p| p[0] <= level).count();
        let text_is_dark = dark * 2 <= (image.width() * image.height()) as usize;

        let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let v = image.get_pixel(x, y)[0];
            let is_text = if text_is_dark { v <= level } else { v > level };
            Luma([if is_text { 255 } else { 0 }])
        });

        if self.config.merge_radius > 0 {
            dilate(&mask, Norm::LInf, self.config.merge_radius)
        } else {
            mask
        }
    }

    fn accepts(&self, rect: &PixelRect, image_area: f32) -> bool {
        rect.height >= self.config.min_region_height as f32
            && rect.width * rect.height >= self.config.min_region_area as f32
            && rect.width * rect.height <= image_area * self.config.max_region_fraction
    }
}

impl RegionDetector for ContourDetector {
    fn detect_regions(&self, image: &GrayImage) -> Result<Vec<NormalizedRect>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::Detect("image has no pixels".to_string()));
        }

        let mask = self.text_mask(image);
        let contours = find_contours::<u32>(&mask);
        let image_area = (width * height) as f32;

        let mut boxes: Vec<PixelRect> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && !c.points.is_empty())
            .map(|c| {
                let min_x = c.points.iter().map(|p| p.x).min().unwrap_or(0);
                let max_x = c.points.iter().map(|p| p.x).max().unwrap_or(0);
                let min_y = c.points.iter().map(|p| p.y).min().unwrap_or(0);
                let max_y = c.points.iter().map(|p| p.y).max().unwrap_or(0);
                PixelRect::new(
                    min_x as f32,
                    min_y as f32,
                    (max_x - min_x + 1) as f32,
                    (max_y - min_y + 1) as f32,
                )
            })
            .filter(|r| self.accepts(r, image_area))
            .collect();

        sort_reading_order(&mut boxes);

        Ok(boxes
            .iter()
            .map(|r| NormalizedRect::from_pixel_rect(r, width, height))
            .collect())
    }
}

/// Sort top-to-bottom by row, then left-to-right within a row
///
/// Two boxes share a row when their vertical centers are closer than half
/// the shorter box's height.
fn sort_reading_order(boxes: &mut Vec<PixelRect>) {
    boxes.sort_by(|a, b| a.center().y.total_cmp(&b.center().y));

    let mut rows: Vec<Vec<PixelRect>> = Vec::new();
    for rect in boxes.drain(..) {
        let joins_last = rows.last().and_then(|row| row.last()).is_some_and(|prev| {
            let tolerance = prev.height.min(rect.height) / 2.0;
            (rect.center().y - prev.center().y).abs() < tolerance
        });
        match rows.last_mut() {
            Some(row) if joins_last => row.push(rect),
            _ => rows.push(vec![rect]),
        }
    }

    for mut row in rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        boxes.extend(row);
    }
}
