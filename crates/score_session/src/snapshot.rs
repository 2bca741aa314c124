//! Read-only views of the session handed to rendering layers

use core_pipeline::{CaptureSource, DetectedNumber, HistoryEntry, SessionId, SessionPhase};

/// Everything a renderer needs, published after every mutation
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Current session; `None` before the first capture
    pub session: Option<SessionId>,
    pub source: CaptureSource,
    pub phase: SessionPhase,
    /// Detected numbers in arrival order
    pub numbers: Vec<DetectedNumber>,
    /// Sum of the selected numbers
    pub total: i64,
    /// History entries, oldest first
    pub history: Vec<HistoryEntry>,
}

impl SessionSnapshot {
    pub fn selected(&self) -> impl Iterator<Item = &DetectedNumber> {
        self.numbers.iter().filter(|n| n.is_selected)
    }
}

/// Outcome of one capture pass
#[derive(Debug, Clone)]
pub struct PassReport {
    pub session: SessionId,
    /// `Aggregated`, or `Aborted` when the image was unusable
    pub phase: SessionPhase,
    /// Regions handed to OCR
    pub regions: usize,
    pub numbers: Vec<DetectedNumber>,
    pub total: i64,
}

impl PassReport {
    pub fn is_aborted(&self) -> bool {
        self.phase == SessionPhase::Aborted
    }
}
