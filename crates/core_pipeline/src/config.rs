//! Pipeline configuration
//!
//! Every knob has a default matching the fixed constants of the scoring
//! pipeline. `from_env` layers `POINTSCORE_*` environment overrides on top.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default number of history snapshots kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Color-control constants applied after the mono conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Contrast multiplier around mid-grey
    pub contrast: f32,
    /// Brightness offset on the unit intensity scale
    pub brightness: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            contrast: 1.2,
            brightness: 0.1,
        }
    }
}

/// Tuning for the contour-based region detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Dilation radius (pixels) used to merge the glyphs of one number
    pub merge_radius: u8,
    /// Regions shorter than this (pixels) are ignored
    pub min_region_height: u32,
    /// Regions with a smaller bounding-box area (pixels) are ignored
    pub min_region_area: u32,
    /// Regions covering more than this fraction of the image are ignored
    pub max_region_fraction: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            merge_radius: 3,
            min_region_height: 6,
            min_region_area: 40,
            max_region_fraction: 0.5,
        }
    }
}

/// Speed/accuracy trade-off of the text recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionLevel {
    #[default]
    Accurate,
    Fast,
}

/// Options handed to the text recognizer for every region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionOptions {
    pub level: RecognitionLevel,
    /// Dictionary-based correction; off for numeric scoreboards
    pub uses_language_correction: bool,
    /// Tesseract language code
    pub language: String,
    /// In accurate mode, crops shorter than this are upscaled first
    pub min_glyph_height: u32,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            uses_language_correction: false,
            language: "eng".to_string(),
            min_glyph_height: 32,
        }
    }
}

/// Configuration for the whole capture-to-score pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub detection: DetectionConfig,
    pub recognition: RecognitionOptions,
    /// Maximum number of history snapshots
    pub history_capacity: usize,
    /// Upper bound on region OCR tasks running at once
    pub max_concurrent_regions: usize,
    /// Log region counts and raw recognized strings
    pub debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            detection: DetectionConfig::default(),
            recognition: RecognitionOptions::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_concurrent_regions: 4,
            debug: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `POINTSCORE_*` environment overrides in place
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(language) = lookup("POINTSCORE_LANGUAGE") {
            let language = language.trim();
            if language.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "POINTSCORE_LANGUAGE",
                    value: language.to_string(),
                    reason: "language code must not be empty".to_string(),
                });
            }
            self.recognition.language = language.to_string();
        }

        if let Some(value) = lookup("POINTSCORE_MAX_CONCURRENT_REGIONS") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "POINTSCORE_MAX_CONCURRENT_REGIONS",
                    value: value.clone(),
                    reason: "expected a positive integer".to_string(),
                })?;
            self.max_concurrent_regions = parsed;
        }

        if let Some(value) = lookup("POINTSCORE_DEBUG") {
            self.debug = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "POINTSCORE_DEBUG",
                        value,
                        reason: "expected a boolean".to_string(),
                    })
                }
            };
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.preprocess.contrast, 1.2);
        assert_eq!(config.preprocess.brightness, 0.1);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.recognition.level, RecognitionLevel::Accurate);
        assert!(!config.recognition.uses_language_correction);
        assert!(!config.debug);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("POINTSCORE_LANGUAGE", "deu"),
                ("POINTSCORE_MAX_CONCURRENT_REGIONS", "8"),
                ("POINTSCORE_DEBUG", "true"),
            ]))
            .unwrap();

        assert_eq!(config.recognition.language, "deu");
        assert_eq!(config.max_concurrent_regions, 8);
        assert!(config.debug);
    }

    #[test]
    fn test_env_override_rejects_zero_concurrency() {
        let mut config = PipelineConfig::default();
        let result =
            config.apply_overrides(lookup_from(&[("POINTSCORE_MAX_CONCURRENT_REGIONS", "0")]));
        assert!(result.is_err());
        assert_eq!(config.max_concurrent_regions, 4);
    }

    #[test]
    fn test_env_override_rejects_bad_bool() {
        let mut config = PipelineConfig::default();
        let result = config.apply_overrides(lookup_from(&[("POINTSCORE_DEBUG", "maybe")]));
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("POINTSCORE_DEBUG"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"preprocess": {"contrast": 1.5}, "debug": true}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.preprocess.contrast, 1.5);
        assert_eq!(config.preprocess.brightness, 0.1);
        assert!(config.debug);
        assert_eq!(config.history_capacity, 10);
    }
}
