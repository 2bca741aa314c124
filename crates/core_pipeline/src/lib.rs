//! Core pipeline for pointscore
//!
//! This crate provides the data structures and processing stages that
//! turn a photo of a board-game scoreboard into a total score:
//! preprocessing, region segmentation, per-region OCR, the detected-number
//! store and the bounded history log.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod capture;
pub mod config;
pub mod error;
pub mod history;
pub mod ocr;
pub mod preprocess;
pub mod scripted;
pub mod segment;
pub mod store;
pub mod types;

pub use capture::CaptureSource;
pub use config::{
    DetectionConfig, PipelineConfig, PreprocessConfig, RecognitionLevel, RecognitionOptions,
};
pub use error::{ConfigError, PipelineError};
pub use history::{HistoryEntry, HistoryLog};
pub use ocr::{RegionCrop, TesseractRecognizer, TextRecognizer};
pub use scripted::ScriptedBackend;
pub use segment::{ContourDetector, RegionDetector};
pub use store::{DetectedNumberStore, ToggleOutcome};
pub use types::*;
