//! Core engine: vocabulary, catalog, session, scheduling, orchestration.

pub mod catalog;
pub mod cookbook;
pub mod engine;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod script;
pub mod session;
pub mod types;
