//! SC-005: Clocks and cancellable ticks.
//!
//! The engine never sleeps. Continuous actions and delayed step transitions
//! are pending entries in a [`Scheduler`], each identified by a
//! [`TickHandle`]. Cancelling is idempotent. At most one tick per
//! [`TickKind`] is pending at any time.

use super::types::TimerKind;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock, zero at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// What a pending tick does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    /// Hold-style duration progress
    Hold,
    /// Wait-style duration progress
    Wait,
    /// Timing-window progress and overrun
    Timing,
    /// StepDone to SpeakingCheck
    SpeakingPrompt,
    /// StepDone or SpeakingCheck to the next step
    Advance,
}

impl TickKind {
    pub fn for_timer(timer: TimerKind) -> Self {
        match timer {
            TimerKind::Hold => Self::Hold,
            TimerKind::Wait => Self::Wait,
            TimerKind::Timing => Self::Timing,
        }
    }

    pub fn timer(self) -> Option<TimerKind> {
        match self {
            Self::Hold => Some(TimerKind::Hold),
            Self::Wait => Some(TimerKind::Wait),
            Self::Timing => Some(TimerKind::Timing),
            Self::SpeakingPrompt | Self::Advance => None,
        }
    }

    /// Delayed step transition rather than an action tick.
    pub fn is_transition(self) -> bool {
        self.timer().is_none()
    }
}

/// Identity of one scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickHandle(u64);

#[derive(Debug, Clone, Copy)]
struct Pending {
    handle: TickHandle,
    kind: TickKind,
    due_ms: u64,
}

/// Pending ticks owned by one engine.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    pending: Vec<Pending>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` at `due_ms`, replacing any pending tick of that kind.
    pub fn schedule(&mut self, kind: TickKind, due_ms: u64) -> TickHandle {
        self.cancel_kind(kind);
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending.push(Pending {
            handle,
            kind,
            due_ms,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TickHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_kind(&mut self, kind: TickKind) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.kind != kind);
        self.pending.len() != before
    }

    /// Cancel everything, returning the kinds that were pending.
    pub fn cancel_all(&mut self) -> Vec<TickKind> {
        self.pending.drain(..).map(|p| p.kind).collect()
    }

    pub fn handle(&self, kind: TickKind) -> Option<TickHandle> {
        self.pending.iter().find(|p| p.kind == kind).map(|p| p.handle)
    }

    pub fn is_scheduled(&self, kind: TickKind) -> bool {
        self.handle(kind).is_some()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|p| p.due_ms).min()
    }

    /// Remove and return the earliest tick due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TickHandle, TickKind)> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due_ms <= now_ms)
            .min_by_key(|(_, p)| (p.due_ms, p.handle))
            .map(|(i, _)| i)?;
        let p = self.pending.remove(idx);
        Some((p.handle, p.kind))
    }

    /// Remove the pending tick of `kind` regardless of its due time.
    pub fn take(&mut self, kind: TickKind) -> Option<TickHandle> {
        let idx = self.pending.iter().position(|p| p.kind == kind)?;
        Some(self.pending.remove(idx).handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
