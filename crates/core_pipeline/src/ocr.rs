//! OCR module
//!
//! Crops a detected region, recognizes its text and keeps it only if it
//! parses as an integer. The production recognizer is Tesseract (via
//! leptess).

use crate::config::{RecognitionLevel, RecognitionOptions};
use crate::error::{PipelineError, Result};
use crate::types::{DetectedNumber, PixelRect};
use image::imageops::{self, FilterType};
use image::GrayImage;
use leptess::{LepTess, Variable};

/// Characters Tesseract may emit when language correction is off
const NUMERIC_ALPHABET: &str = "0123456789+-";

/// A cropped region together with where it came from
#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub image: GrayImage,
    /// Source rectangle in the preprocessed image
    pub bounds: PixelRect,
}

/// Text-recognition capability
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in a crop
    ///
    /// Returns the top candidate string for each recognized line, top to
    /// bottom.
    fn recognize_text(&self, crop: &RegionCrop, options: &RecognitionOptions)
        -> Result<Vec<String>>;
}

/// Crop a region out of the preprocessed image
///
/// The rectangle is expanded outward to whole pixels and clamped to the
/// image. Returns `None` when nothing is left.
pub fn crop_region(image: &GrayImage, region: &PixelRect) -> Option<RegionCrop> {
    let (w, h) = image.dimensions();
    let bounds = region.clamp_to(w, h);
    if bounds.is_empty() {
        return None;
    }

    let x0 = bounds.x.floor() as u32;
    let y0 = bounds.y.floor() as u32;
    let x1 = ((bounds.x + bounds.width).ceil() as u32).min(w);
    let y1 = ((bounds.y + bounds.height).ceil() as u32).min(h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let cropped = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
    Some(RegionCrop {
        image: cropped,
        bounds: *region,
    })
}

/// Parse recognized text as an integer score
///
/// Only surrounding whitespace is tolerated.
pub fn parse_number(text: &str) -> Option<i32> {
    text.trim().parse::<i32>().ok()
}

/// Run OCR on one region and turn it into a detected number
///
/// The first non-empty recognized line is the region's text. Recognition
/// failures, empty results and non-numeric text all yield `None`.
pub fn extract_number(
    image: &GrayImage,
    region: &PixelRect,
    recognizer: &dyn TextRecognizer,
    options: &RecognitionOptions,
) -> Option<DetectedNumber> {
    let crop = crop_region(image, region)?;

    let lines = match recognizer.recognize_text(&crop, options) {
        Ok(lines) => lines,
        Err(e) => {
            tracing::debug!("OCR failed for region {:?}: {}", region, e);
            return None;
        }
    };

    tracing::debug!("OCR raw text for region {:?}: {:?}", region, lines);

    let text = lines.iter().map(|l| l.trim()).find(|l| !l.is_empty())?;

    match parse_number(text) {
        Some(value) => Some(DetectedNumber::new(text, value, region)),
        None => {
            tracing::debug!("Skipping non-numeric region text {:?}", text);
            None
        }
    }
}

/// Tesseract-backed recognizer
///
/// A fresh Tesseract instance is created per call, so one recognizer can
/// serve concurrent region tasks.
#[derive(Debug, Clone, Default)]
pub struct TesseractRecognizer {
    /// Directory holding `*.traineddata`; Tesseract's default if `None`
    pub data_path: Option<String>,
}

impl TesseractRecognizer {
    pub fn new(data_path: Option<String>) -> Self {
        Self { data_path }
    }

    fn engine(&self, options: &RecognitionOptions) -> Result<LepTess> {
        let mut tesseract = LepTess::new(self.data_path.as_deref(), &options.language)
            .map_err(|e| {
                PipelineError::Recognize(format!(
                    "Failed to initialize Tesseract. Is Tesseract installed? ({})",
                    e
                ))
            })?;

        for (name, value) in engine_variables(options) {
            set_variable(&mut tesseract, name, value)?;
        }

        Ok(tesseract)
    }
}

/// Runtime Tesseract variables for a set of recognition options
///
/// Every region is read as a single text line. With language correction
/// off, words outside the dictionary are no longer penalized and the
/// output alphabet is restricted to digits and signs. The dictionaries
/// themselves can only be unloaded at engine init, which leptess does not
/// expose.
fn engine_variables(options: &RecognitionOptions) -> Vec<(Variable, &'static str)> {
    let mut variables = vec![(Variable::TesseditPagesegMode, "7")];
    if !options.uses_language_correction {
        variables.push((Variable::LanguageModelPenaltyNonDictWord, "0"));
        variables.push((Variable::LanguageModelPenaltyNonFreqDictWord, "0"));
        variables.push((Variable::TesseditCharWhitelist, NUMERIC_ALPHABET));
    }
    variables
}

fn set_variable(tesseract: &mut LepTess, name: Variable, value: &str) -> Result<()> {
    tesseract
        .set_variable(name, value)
        .map_err(|e| PipelineError::Recognize(format!("Failed to configure Tesseract: {}", e)))
}

/// Scale a crop up so its height reaches `min_height`
fn upscale_for_accuracy(image: &GrayImage, min_height: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if h == 0 || h >= min_height {
        return image.clone();
    }
    let scale = min_height as f32 / h as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(1);
    imageops::resize(image, new_w, min_height, FilterType::CatmullRom)
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize_text(
        &self,
        crop: &RegionCrop,
        options: &RecognitionOptions,
    ) -> Result<Vec<String>> {
        let input = match options.level {
            RecognitionLevel::Accurate => upscale_for_accuracy(&crop.image, options.min_glyph_height),
            RecognitionLevel::Fast => crop.image.clone(),
        };

        // leptess takes encoded image data
        let mut png_bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut png_bytes);
        input
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| PipelineError::Recognize(format!("Failed to encode crop as PNG: {}", e)))?;

        let mut tesseract = self.engine(options)?;
        tesseract
            .set_image_from_mem(&png_bytes)
            .map_err(|e| PipelineError::Recognize(format!("Failed to load crop into Tesseract: {}", e)))?;

        let text = tesseract
            .get_utf8_text()
            .map_err(|e| PipelineError::Recognize(format!("Failed to extract text: {}", e)))?;

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}
