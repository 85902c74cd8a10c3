//! Journal: JSONL transcripts of engine notifications.

pub mod transcript;
