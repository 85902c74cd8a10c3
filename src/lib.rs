//! Souschef: gesture-driven cooking tutorial engine.
//!
//! A recipe is a list of steps; each step asks for one gesture-driven action
//! (tap, swipe, hold, turn a knob, stop a timer, drag items into a zone). The
//! [`core::engine::StepEngine`] turns discrete inputs and scheduled ticks into
//! step transitions, score and notifications for a UI to render.

pub mod cli;
pub mod core;
pub mod journal;
