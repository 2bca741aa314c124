//! Bounded history of scored captures
//!
//! Strict FIFO: once the log holds more than `capacity` entries the oldest
//! is dropped. No deduplication, nothing persisted.

use crate::capture::CaptureSource;
use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::preprocess::compute_image_hash;
use crate::types::SessionId;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::collections::VecDeque;
use std::sync::Arc;

/// A scored image snapshot
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Preprocessed image the score was computed from
    pub image: Arc<DynamicImage>,
    /// Total score when the pass completed
    pub score: i64,
    /// Session that produced the entry
    pub session: SessionId,
    pub source: CaptureSource,
    /// How many numbers were detected
    pub number_count: usize,
    pub recorded_at: DateTime<Utc>,
    /// SHA-256 of the snapshot pixels
    pub image_digest: String,
}

impl HistoryEntry {
    pub fn new(
        image: Arc<DynamicImage>,
        score: i64,
        session: SessionId,
        source: CaptureSource,
        number_count: usize,
    ) -> Self {
        let image_digest = compute_image_hash(&image);
        Self {
            image,
            score,
            session,
            source,
            number_count,
            recorded_at: Utc::now(),
            image_digest,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding at most `capacity` entries (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when over capacity
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: i64) -> HistoryEntry {
        let image = Arc::new(DynamicImage::new_luma8(2, 2));
        HistoryEntry::new(image, score, SessionId::new(), CaptureSource::Camera, 0)
    }

    #[test]
    fn test_history_never_exceeds_ten() {
        let mut log = HistoryLog::new();
        for score in 1..=25 {
            log.record(entry(score));
            assert!(log.len() <= 10);
        }
        assert_eq!(log.len(), 10);
    }

    #[test]
    fn test_eleventh_entry_evicts_first() {
        let mut log = HistoryLog::new();
        for score in 1..=11 {
            log.record(entry(score));
        }

        let scores: Vec<i64> = log.entries().map(|e| e.score).collect();
        assert_eq!(scores, (2..=11).collect::<Vec<i64>>());
        assert_eq!(log.latest().unwrap().score, 11);
    }

    #[test]
    fn test_no_deduplication() {
        let mut log = HistoryLog::new();
        log.record(entry(5));
        log.record(entry(5));
        assert_eq!(log.len(), 2);
        let digests: Vec<&str> = log.entries().map(|e| e.image_digest.as_str()).collect();
        assert_eq!(digests[0], digests[1]);
    }

    #[test]
    fn test_custom_capacity() {
        let mut log = HistoryLog::with_capacity(3);
        for score in 0..5 {
            log.record(entry(score));
        }
        let scores: Vec<i64> = log.entries().map(|e| e.score).collect();
        assert_eq!(scores, vec![2, 3, 4]);

        assert_eq!(HistoryLog::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn test_clear() {
        let mut log = HistoryLog::new();
        log.record(entry(1));
        log.clear();
        assert!(log.is_empty());
        assert!(log.latest().is_none());
    }
}
