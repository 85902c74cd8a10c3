//! SC-009: Append-only JSONL notification transcript.
//!
//! One stamped notification per line, e.g.
//! `{"at_ms":2100,"event":"step_state_changed","state":"ready_action"}`.
//! A transcript records what happened during a run; it is never read back
//! into a session.

use crate::core::error::JournalError;
use crate::core::events::Stamped;
use indexmap::IndexMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Append `entries` to the transcript at `path`, creating parent directories.
/// Returns the number of lines written.
pub fn append_transcript(path: &Path, entries: &[Stamped]) -> Result<usize, JournalError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let mut out = BufWriter::new(file);
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(entries.len())
}

/// Read a transcript back. Blank lines are skipped.
pub fn read_transcript(path: &Path) -> Result<Vec<Stamped>, JournalError> {
    let file = std::fs::File::open(path)?;
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}

/// Count entries per event name, in first-seen order.
pub fn summarize(entries: &[Stamped]) -> IndexMap<&'static str, usize> {
    let mut counts = IndexMap::new();
    for entry in entries {
        *counts.entry(entry.notification.name()).or_insert(0) += 1;
    }
    counts
}
