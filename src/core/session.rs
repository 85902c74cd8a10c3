//! SC-004: Session state.
//!
//! The mutable run-time store for one recipe run: step index and state,
//! per-action counters/stopwatches/values, the zone multiset, processed
//! items, score and the pause flag. Owned and mutated by the step engine;
//! consumers only ever see it through `&SessionState`.
//!
//! Time never comes from a clock here. Every timer operation takes the
//! caller's `now_ms`, which keeps the store deterministic.

use super::catalog::{ActionCatalog, ActionSnapshot, ActionSpec};
use super::types::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

// ============================================================================
// Stopwatch
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Idle,
    Running {
        since_ms: u64,
    },
    /// Active but frozen while the session is paused
    Suspended,
    Stopped,
}

/// Pause-aware stopwatch. The active flag and start timestamp live in one
/// enum, so they cannot disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stopwatch {
    phase: Phase,
    accumulated_ms: u64,
}

impl Stopwatch {
    /// Start from zero, discarding any previous measurement.
    pub fn start(&mut self, now_ms: u64) {
        self.accumulated_ms = 0;
        self.phase = Phase::Running { since_ms: now_ms };
    }

    /// Freeze the measurement. Returns true if the watch was active.
    pub fn stop(&mut self, now_ms: u64) -> bool {
        match self.phase {
            Phase::Running { since_ms } => {
                self.accumulated_ms += now_ms.saturating_sub(since_ms);
                self.phase = Phase::Stopped;
                true
            }
            Phase::Suspended => {
                self.phase = Phase::Stopped;
                true
            }
            Phase::Idle | Phase::Stopped => false,
        }
    }

    pub fn suspend(&mut self, now_ms: u64) {
        if let Phase::Running { since_ms } = self.phase {
            self.accumulated_ms += now_ms.saturating_sub(since_ms);
            self.phase = Phase::Suspended;
        }
    }

    pub fn resume(&mut self, now_ms: u64) {
        if self.phase == Phase::Suspended {
            self.phase = Phase::Running { since_ms: now_ms };
        }
    }

    /// Clamp a frozen measurement to `limit_ms`.
    pub fn cap(&mut self, limit_ms: u64) {
        self.accumulated_ms = self.accumulated_ms.min(limit_ms);
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Running { .. } | Phase::Suspended)
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    /// 0 if never started, live while running, frozen otherwise.
    pub fn elapsed(&self, now_ms: u64) -> u64 {
        match self.phase {
            Phase::Idle => 0,
            Phase::Running { since_ms } => self.accumulated_ms + now_ms.saturating_sub(since_ms),
            Phase::Suspended | Phase::Stopped => self.accumulated_ms,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Mutable run-time store for one recipe run.
#[derive(Debug, Clone)]
pub struct SessionState {
    recipe: Option<Arc<Recipe>>,
    step_index: usize,
    step_state: StepState,
    counters: FxHashMap<CounterKind, u32>,
    timers: FxHashMap<TimerKind, Stopwatch>,
    values: FxHashMap<ValueKind, f64>,
    zone_items: FxHashMap<Zone, FxHashMap<ItemId, u32>>,
    processed: FxHashSet<ItemId>,
    score: u32,
    steps_completed: u32,
    speaking_attempts: u32,
    speaking_correct: u32,
    paused: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            recipe: None,
            step_index: 0,
            step_state: StepState::WaitingItem,
            counters: FxHashMap::default(),
            timers: FxHashMap::default(),
            values: FxHashMap::default(),
            zone_items: FxHashMap::default(),
            processed: FxHashSet::default(),
            score: 0,
            steps_completed: 0,
            speaking_attempts: 0,
            speaking_correct: 0,
            paused: false,
        }
    }

    /// Full reset onto step 0 of `recipe`.
    pub fn start_recipe(&mut self, recipe: Arc<Recipe>) {
        *self = Self::new();
        self.recipe = Some(recipe);
        self.enter_step(0);
    }

    /// Move to the next step, or to RecipeDone after the last one.
    /// Returns true if a new step was entered.
    pub fn advance(&mut self) -> bool {
        let next = self.step_index + 1;
        if next < self.total_steps() {
            self.enter_step(next);
            true
        } else {
            self.reset_action_slots();
            self.step_state = StepState::RecipeDone;
            false
        }
    }

    fn enter_step(&mut self, index: usize) {
        self.step_index = index;
        self.reset_action_slots();
        self.step_state = match self.active_spec() {
            Some(spec) => spec.category.initial_state(),
            None => StepState::RecipeDone,
        };
    }

    fn reset_action_slots(&mut self) {
        self.counters.clear();
        self.timers.clear();
        self.values.clear();
    }

    // --- Accessors ---

    pub fn recipe(&self) -> Option<&Arc<Recipe>> {
        self.recipe.as_ref()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.recipe.as_ref()?.steps.get(self.step_index)
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn total_steps(&self) -> usize {
        self.recipe.as_ref().map_or(0, |r| r.steps.len())
    }

    pub fn step_state(&self) -> StepState {
        self.step_state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn steps_completed(&self) -> u32 {
        self.steps_completed
    }

    pub fn speaking_attempts(&self) -> u32 {
        self.speaking_attempts
    }

    pub fn speaking_correct(&self) -> u32 {
        self.speaking_correct
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// "Step i / N", or empty before a recipe starts.
    pub fn progress_text(&self) -> String {
        if self.recipe.is_none() {
            return String::new();
        }
        format!("Step {} / {}", self.step_index + 1, self.total_steps())
    }

    pub fn active_spec(&self) -> Option<&'static ActionSpec> {
        self.current_step().map(|s| ActionCatalog::spec(s.action))
    }

    pub fn active_action_type(&self) -> Option<ActionType> {
        self.current_step().map(ActionCatalog::action_type)
    }

    pub fn active_category(&self) -> Option<ActionCategory> {
        self.active_spec().map(|s| s.category)
    }

    // --- Step state transitions ---

    /// Set `to` only if the current state is `expected`.
    pub fn compare_and_set(&mut self, expected: StepState, to: StepState) -> bool {
        if self.step_state != expected {
            return false;
        }
        self.step_state = to;
        true
    }

    /// The single transition out of an action into StepDone. Only the first
    /// caller per step succeeds.
    pub fn try_finish_action(&mut self) -> bool {
        if !self.step_state.accepts_action_input() {
            return false;
        }
        self.step_state = StepState::StepDone;
        self.steps_completed += 1;
        true
    }

    // --- Zones ---

    pub fn add_item_to_zone(&mut self, zone: Zone, item: &str) {
        *self
            .zone_items
            .entry(zone)
            .or_default()
            .entry(item.to_string())
            .or_insert(0) += 1;
    }

    /// Remove one copy. Returns false if the zone held none.
    pub fn remove_item_from_zone(&mut self, zone: Zone, item: &str) -> bool {
        let Some(items) = self.zone_items.get_mut(&zone) else {
            return false;
        };
        match items.get_mut(item) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                items.remove(item);
                true
            }
            None => false,
        }
    }

    pub fn zone_count(&self, zone: Zone, item: &str) -> u32 {
        self.zone_items
            .get(&zone)
            .and_then(|items| items.get(item))
            .copied()
            .unwrap_or(0)
    }

    /// Distinct items in a zone, sorted by id.
    pub fn zone_items(&self, zone: Zone) -> Vec<(&str, u32)> {
        let mut items: Vec<(&str, u32)> = self
            .zone_items
            .get(&zone)
            .map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)).collect())
            .unwrap_or_default();
        items.sort_unstable();
        items
    }

    /// Required items and tool of the current step not yet in its zone.
    pub fn zone_missing(&self) -> Vec<&str> {
        let Some(step) = self.current_step() else {
            return Vec::new();
        };
        let mut missing: Vec<&str> = Vec::new();
        for id in step.items.iter().map(String::as_str).chain(step.tool.as_deref()) {
            if self.zone_count(step.zone, id) == 0 && !missing.contains(&id) {
                missing.push(id);
            }
        }
        missing
    }

    fn zone_required(&self) -> usize {
        let Some(step) = self.current_step() else {
            return 0;
        };
        let mut ids: Vec<&str> = step.items.iter().map(String::as_str).collect();
        ids.extend(step.tool.as_deref());
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    // --- Counters ---

    /// Increment `kind` if the current action counts it.
    pub fn increment_counter(&mut self, kind: CounterKind) -> bool {
        if self.active_spec().map(|s| s.slot) != Some(Slot::Counter(kind)) {
            return false;
        }
        *self.counters.entry(kind).or_insert(0) += 1;
        true
    }

    pub fn counter(&self, kind: CounterKind) -> u32 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    // --- Timers ---

    fn uses_timer(&self, kind: TimerKind) -> bool {
        self.active_spec().map(|s| s.slot) == Some(Slot::Timer(kind))
    }

    /// Start `kind` from zero if the current action measures it.
    pub fn start_timer(&mut self, kind: TimerKind, now_ms: u64) -> bool {
        if !self.uses_timer(kind) {
            return false;
        }
        self.timers.entry(kind).or_default().start(now_ms);
        true
    }

    /// Freeze `kind`. Returns true if it was active.
    pub fn stop_timer(&mut self, kind: TimerKind, now_ms: u64) -> bool {
        self.timers
            .get_mut(&kind)
            .is_some_and(|watch| watch.stop(now_ms))
    }

    pub fn cap_timer(&mut self, kind: TimerKind, limit_ms: u64) {
        if let Some(watch) = self.timers.get_mut(&kind) {
            watch.cap(limit_ms);
        }
    }

    pub fn timer_active(&self, kind: TimerKind) -> bool {
        self.timers.get(&kind).is_some_and(Stopwatch::is_active)
    }

    pub fn elapsed(&self, kind: TimerKind, now_ms: u64) -> u64 {
        self.timers.get(&kind).map_or(0, |w| w.elapsed(now_ms))
    }

    // --- Values ---

    /// Record a rotary/slider reading if the current action reads it.
    pub fn set_value(&mut self, kind: ValueKind, value: f64) -> bool {
        if self.active_spec().map(|s| s.slot) != Some(Slot::Value(kind)) {
            return false;
        }
        self.values.insert(kind, value);
        true
    }

    pub fn value(&self, kind: ValueKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    // --- Progress (read-only, via the category table) ---

    /// View of the current action's slots at `now_ms`.
    pub fn snapshot(&self, now_ms: u64) -> Option<ActionSnapshot> {
        let step = self.current_step()?;
        let spec = ActionCatalog::spec(step.action);
        let (count, elapsed_ms, stopped, value) = match spec.slot {
            Slot::Counter(kind) => (self.counter(kind), 0, false, None),
            Slot::Timer(kind) => (
                0,
                self.elapsed(kind, now_ms),
                self.timers.get(&kind).is_some_and(Stopwatch::is_stopped),
                None,
            ),
            Slot::Value(kind) => (0, 0, false, self.value(kind)),
            Slot::Zone => (0, 0, false, None),
        };
        let recipe = self.recipe.as_ref()?;
        Some(ActionSnapshot {
            spec,
            action: spec.action_type(&step.params),
            count,
            elapsed_ms,
            stopped,
            value,
            zone: step.zone,
            zone_required: self.zone_required(),
            zone_missing: self
                .zone_missing()
                .into_iter()
                .map(|id| recipe.label(id))
                .collect(),
        })
    }

    pub fn progress(&self, now_ms: u64) -> f64 {
        self.snapshot(now_ms).map_or(0.0, |s| ActionCatalog::progress(&s))
    }

    pub fn is_complete(&self, now_ms: u64) -> bool {
        self.snapshot(now_ms).is_some_and(|s| ActionCatalog::is_complete(&s))
    }

    // --- Score and bookkeeping ---

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn mark_processed(&mut self, item: &str) {
        self.processed.insert(item.to_string());
    }

    pub fn is_processed(&self, item: &str) -> bool {
        self.processed.contains(item)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn record_speaking(&mut self, correct: bool) {
        self.speaking_attempts += 1;
        if correct {
            self.speaking_correct += 1;
        }
    }

    // --- Pause ---

    /// Freeze every running stopwatch.
    pub fn pause(&mut self, now_ms: u64) {
        self.paused = true;
        for watch in self.timers.values_mut() {
            watch.suspend(now_ms);
        }
    }

    /// Restart frozen stopwatches from `now_ms`; paused time is excluded.
    pub fn resume(&mut self, now_ms: u64) {
        self.paused = false;
        for watch in self.timers.values_mut() {
            watch.resume(now_ms);
        }
    }
}
