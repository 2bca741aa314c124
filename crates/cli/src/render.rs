//! Text and JSON rendering of sessions and history

use chrono::{DateTime, Utc};
use core_pipeline::{DetectedNumber, SessionId, SessionPhase};
use score_session::SessionSnapshot;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Serialize)]
pub struct ScoreOutput<'a> {
    pub session: Option<SessionId>,
    pub phase: SessionPhase,
    pub numbers: &'a [DetectedNumber],
    pub total: i64,
}

#[derive(Serialize)]
pub struct HistoryOutput {
    pub index: usize,
    pub session: SessionId,
    pub file: Option<PathBuf>,
    pub score: i64,
    pub numbers: usize,
    pub digest: String,
    pub recorded_at: DateTime<Utc>,
}

pub fn score_json(snapshot: &SessionSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ScoreOutput {
        session: snapshot.session,
        phase: snapshot.phase,
        numbers: &snapshot.numbers,
        total: snapshot.total,
    })
}

pub fn score_text(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    if snapshot.numbers.is_empty() {
        out.push_str("No numbers detected.\n");
    } else {
        out.push_str("Detected numbers:\n");
        for (i, number) in snapshot.numbers.iter().enumerate() {
            out.push_str(&format!(
                "  [{}] {:>6}  at ({:.0}, {:.0})  {}x{}  {}\n",
                i + 1,
                number.text,
                number.position.x,
                number.position.y,
                number.size.width.round(),
                number.size.height.round(),
                if number.is_selected {
                    "included"
                } else {
                    "excluded"
                }
            ));
        }
    }

    out.push_str(&format!("Total score: {}\n", snapshot.total));
    out
}

pub fn history_rows(
    snapshot: &SessionSnapshot,
    files: &HashMap<SessionId, PathBuf>,
) -> Vec<HistoryOutput> {
    snapshot
        .history
        .iter()
        .enumerate()
        .map(|(i, entry)| HistoryOutput {
            index: i + 1,
            session: entry.session,
            file: files.get(&entry.session).cloned(),
            score: entry.score,
            numbers: entry.number_count,
            digest: entry.image_digest.clone(),
            recorded_at: entry.recorded_at,
        })
        .collect()
}

pub fn history_text(rows: &[HistoryOutput]) -> String {
    if rows.is_empty() {
        return "History is empty.\n".to_string();
    }

    let mut out = String::from("History (oldest first):\n");
    for row in rows {
        let name = row
            .file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  Image {:>2}: score {:>5}  ({} numbers)  {}  {}\n",
            row.index,
            row.score,
            row.numbers,
            &row.digest[..row.digest.len().min(12)],
            name
        ));
    }
    out
}
