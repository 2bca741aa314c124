//! Scoring session controller
//!
//! Owns the detected-number store and history log on a single task and
//! drives capture passes asynchronously. Region OCR runs concurrently;
//! every mutation is applied by the owner task in arrival order.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod controller;
pub mod pass;
pub mod snapshot;

pub use controller::{Backends, ControllerError, PendingPass, ScoreController};
pub use snapshot::{PassReport, SessionSnapshot};
