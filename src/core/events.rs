//! SC-006: Outbound notifications and the sink that receives them.

use super::scheduler::Clock;
use super::types::*;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Everything the engine tells its UI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    StepChanged {
        index: usize,
        total: usize,
        step: Step,
    },
    StepStateChanged {
        state: StepState,
    },
    ActionProgress {
        action: ActionId,
        progress: f64,
    },
    ActionComplete {
        action: ActionId,
    },
    ItemPlaced {
        item: ItemId,
        zone: Zone,
    },
    StepSuccess {
        text: String,
    },
    SpeakingRequired {
        phrase: String,
    },
    SpeakingResult {
        correct: bool,
        phrase: String,
    },
    RecipeComplete {
        score: u32,
    },
    Hint {
        text: String,
    },
    Error {
        message: String,
    },
    /// Chef line for the step just entered
    Instruction {
        text: String,
    },
    /// Countdown for wait-style actions
    TimerRemaining {
        remaining_ms: u64,
    },
    TimingResult {
        elapsed_ms: u64,
        perfect: bool,
    },
}

impl Notification {
    /// The serde tag, e.g. `step_changed`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StepChanged { .. } => "step_changed",
            Self::StepStateChanged { .. } => "step_state_changed",
            Self::ActionProgress { .. } => "action_progress",
            Self::ActionComplete { .. } => "action_complete",
            Self::ItemPlaced { .. } => "item_placed",
            Self::StepSuccess { .. } => "step_success",
            Self::SpeakingRequired { .. } => "speaking_required",
            Self::SpeakingResult { .. } => "speaking_result",
            Self::RecipeComplete { .. } => "recipe_complete",
            Self::Hint { .. } => "hint",
            Self::Error { .. } => "error",
            Self::Instruction { .. } => "instruction",
            Self::TimerRemaining { .. } => "timer_remaining",
            Self::TimingResult { .. } => "timing_result",
        }
    }
}

/// A notification with the engine time it was emitted at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped {
    pub at_ms: u64,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Receiver of engine notifications. Observes only, never mutates the session.
pub trait EventSink {
    fn notify(&mut self, notification: &Notification);
}

/// Sink that keeps every notification. Clones share one log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    log: Rc<RefCell<Vec<Stamped>>>,
    clock: Option<Rc<dyn Clock>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp each notification with `clock`.
    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            log: Rc::default(),
            clock: Some(clock),
        }
    }

    pub fn stamped(&self) -> Vec<Stamped> {
        self.log.borrow().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log
            .borrow()
            .iter()
            .map(|s| s.notification.clone())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Notification) -> bool) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|s| pred(&s.notification))
            .count()
    }

    /// Step states in the order they were announced.
    pub fn states(&self) -> Vec<StepState> {
        self.log
            .borrow()
            .iter()
            .filter_map(|s| match s.notification {
                Notification::StepStateChanged { state } => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl EventSink for RecordingSink {
    fn notify(&mut self, notification: &Notification) {
        let at_ms = self.clock.as_ref().map_or(0, |c| c.now_ms());
        self.log.borrow_mut().push(Stamped {
            at_ms,
            notification: notification.clone(),
        });
    }
}
