//! Core types for the scoring pipeline
//!
//! Geometry, detected numbers and session bookkeeping shared by every
//! stage of the pipeline and by the session controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a detected number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumberId(pub Uuid);

impl NumberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NumberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NumberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for one capture-to-aggregate pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A point in image pixel coordinates (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned rectangle in image pixels, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Intersect with a `width` x `height` image
    pub fn clamp_to(&self, width: u32, height: u32) -> PixelRect {
        let (w, h) = (width as f32, height as f32);
        let x0 = self.x.clamp(0.0, w);
        let y0 = self.y.clamp(0.0, h);
        let x1 = (self.x + self.width).clamp(0.0, w);
        let y1 = (self.y + self.height).clamp(0.0, h);
        PixelRect::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }
}

/// Detector-native rectangle: unit square, origin at the bottom-left corner
///
/// `y` is the distance of the rectangle's *bottom* edge from the bottom of
/// the image, as a fraction of the image height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert into top-left-origin pixel space of a `width` x `height` image
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> PixelRect {
        let (w, h) = (width as f32, height as f32);
        PixelRect {
            x: self.x * w,
            y: (1.0 - self.y - self.height) * h,
            width: self.width * w,
            height: self.height * h,
        }
    }

    /// Inverse of [`NormalizedRect::to_pixel_rect`]
    pub fn from_pixel_rect(rect: &PixelRect, width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        NormalizedRect {
            x: rect.x / w,
            y: 1.0 - (rect.y + rect.height) / h,
            width: rect.width / w,
            height: rect.height / h,
        }
    }
}

/// A number recognized in one region of the scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedNumber {
    /// Unique identifier
    pub id: NumberId,
    /// Trimmed text as recognized
    pub text: String,
    /// Parsed integer value
    pub value: i32,
    /// Center of the source region
    pub position: Point,
    /// Dimensions of the source region
    pub size: Size,
    /// Whether the value counts toward the total
    pub is_selected: bool,
}

impl DetectedNumber {
    /// New number for a region, selected by default
    pub fn new(text: impl Into<String>, value: i32, region: &PixelRect) -> Self {
        Self {
            id: NumberId::new(),
            text: text.into(),
            value,
            position: region.center(),
            size: region.size(),
            is_selected: true,
        }
    }

    /// Amount this number currently adds to the total
    pub fn contribution(&self) -> i64 {
        if self.is_selected {
            i64::from(self.value)
        } else {
            0
        }
    }
}

/// Where a session currently is in the capture-to-aggregate cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing captured yet
    #[default]
    Idle,
    /// Image received, pipeline not yet started
    Capturing,
    Preprocessing,
    Segmenting,
    /// OCR running for `total` regions, `pending` of them outstanding
    ExtractingRegions { total: usize, pending: usize },
    /// Every region reported and the score was committed to history
    Aggregated,
    /// Image data was missing or unreadable
    Aborted,
}

impl SessionPhase {
    /// True once no more pipeline work is expected for the session
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionPhase::Idle | SessionPhase::Aggregated | SessionPhase::Aborted
        )
    }
}
