//! SC-007: Step engine, the orchestrating state machine.
//!
//! Turns discrete input events and scheduled ticks into step transitions,
//! scoring and notifications:
//!
//! WaitingItem → ReadyAction → ActionInProgress → StepDone → (SpeakingCheck) → next step
//!
//! Every public input either performs its effect or is a silent no-op; only an
//! unknown recipe id is reported. Leaving an action for StepDone goes through
//! [`SessionState::try_finish_action`], so a tick and an input-end handler
//! racing to complete the same action award the step bonus once.

use super::catalog::{is_perfect_stop, ActionCatalog};
use super::cookbook::RecipeSource;
use super::error::EngineError;
use super::events::{EventSink, Notification};
use super::scheduler::{Clock, Scheduler, TickKind};
use super::session::SessionState;
use super::types::*;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Drives one recipe run at a time.
pub struct StepEngine {
    config: EngineConfig,
    recipes: Arc<dyn RecipeSource>,
    clock: Box<dyn Clock>,
    sink: Option<Box<dyn EventSink>>,
    state: SessionState,
    ticks: Scheduler,
    /// Step transitions cancelled by pause, re-armed on resume
    deferred: Vec<TickKind>,
    running: bool,
    recipe_id: Option<String>,
}

impl StepEngine {
    pub fn new(
        config: EngineConfig,
        recipes: Arc<dyn RecipeSource>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            config,
            recipes,
            clock,
            sink: None,
            state: SessionState::new(),
            ticks: Scheduler::new(),
            deferred: Vec::new(),
            running: false,
            recipe_id: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn step_state(&self) -> StepState {
        self.state.step_state()
    }

    pub fn score(&self) -> u32 {
        self.state.score()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn recipe_id(&self) -> Option<&str> {
        self.recipe_id.as_deref()
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Current action's progress in [0, 1].
    pub fn progress(&self) -> f64 {
        self.state.progress(self.now())
    }

    pub fn progress_text(&self) -> String {
        self.state.progress_text()
    }

    pub fn is_scheduled(&self, kind: TickKind) -> bool {
        self.ticks.is_scheduled(kind)
    }

    /// Earliest pending tick deadline.
    pub fn next_due(&self) -> Option<u64> {
        self.ticks.next_due()
    }

    /// Hint for the current state. Never mutates anything.
    pub fn hint_text(&self) -> String {
        match self.state.step_state() {
            StepState::RecipeDone => {
                return format!("Recipe complete! Score: {}", self.state.score());
            }
            StepState::StepDone => {
                if let Some(step) = self.state.current_step() {
                    return step.success.clone();
                }
            }
            StepState::SpeakingCheck => {
                if let Some(phrase) = self.state.current_step().and_then(Step::speaking_phrase) {
                    return format!("Say: \"{}\"", phrase);
                }
            }
            StepState::WaitingItem | StepState::ReadyAction | StepState::ActionInProgress => {
                if let Some(snapshot) = self.state.snapshot(self.now()) {
                    return ActionCatalog::hint(&snapshot);
                }
            }
        }
        String::new()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Reset the session onto step 0 of recipe `id`.
    pub fn start_recipe(&mut self, id: &str) -> Result<(), EngineError> {
        let recipe = match self.recipes.recipe(id) {
            Some(recipe) if recipe.steps.is_empty() => {
                return Err(self.report(EngineError::EmptyRecipe(id.to_string())));
            }
            Some(recipe) => recipe,
            None => return Err(self.report(EngineError::RecipeNotFound(id.to_string()))),
        };
        self.ticks.cancel_all();
        self.deferred.clear();
        info!(recipe = id, steps = recipe.steps.len(), "recipe started");
        self.state.start_recipe(recipe);
        self.running = true;
        self.recipe_id = Some(id.to_string());
        self.announce_step();
        Ok(())
    }

    /// Start the current recipe over. No-op before any recipe started.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        match self.recipe_id.clone() {
            Some(id) => self.start_recipe(&id),
            None => Ok(()),
        }
    }

    /// Cancel every tick and drop the sink. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.ticks.cancel_all();
        self.deferred.clear();
        self.sink = None;
        if self.running {
            debug!("engine torn down");
        }
        self.running = false;
    }

    pub fn pause(&mut self) {
        if !self.running || self.state.is_paused() {
            return;
        }
        let now = self.now();
        self.deferred = self
            .ticks
            .cancel_all()
            .into_iter()
            .filter(|k| k.is_transition())
            .collect();
        self.state.pause(now);
        debug!(deferred = self.deferred.len(), "paused");
    }

    pub fn resume(&mut self) {
        if !self.running || !self.state.is_paused() {
            return;
        }
        let now = self.now();
        self.state.resume(now);
        for kind in std::mem::take(&mut self.deferred) {
            let delay = self.transition_delay(kind);
            self.ticks.schedule(kind, now.saturating_add(delay));
        }
        if self.state.step_state() == StepState::ActionInProgress {
            // A hold released while paused may already have reached its target.
            if self.state.is_complete(now) {
                debug!("action finished while paused");
                self.complete_action();
            } else if let Some(Slot::Timer(timer)) = self.state.active_spec().map(|s| s.slot) {
                if self.state.timer_active(timer) {
                    self.schedule_tick(TickKind::for_timer(timer), now);
                }
            }
        }
        debug!("resumed");
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Drop `item` into `zone`. Returns true if the drop was accepted.
    pub fn drop_item(&mut self, item: &str, zone: Zone) -> bool {
        if !self.accepting() {
            return false;
        }
        let state = self.state.step_state();
        if !matches!(
            state,
            StepState::WaitingItem | StepState::ReadyAction | StepState::ActionInProgress
        ) {
            trace!(item, %state, "stale drop");
            return false;
        }
        let Some(step) = self.state.current_step() else {
            return false;
        };
        if !step.accepts_drop(item, zone) {
            debug!(item, %zone, "drop rejected");
            return false;
        }
        self.state.add_item_to_zone(zone, item);
        self.emit(Notification::ItemPlaced {
            item: item.to_string(),
            zone,
        });

        if self.state.active_category() == Some(ActionCategory::ZoneFill) {
            let now = self.now();
            self.emit_progress(now);
            if self.state.is_complete(now)
                && self
                    .state
                    .compare_and_set(StepState::WaitingItem, StepState::ReadyAction)
            {
                self.emit_state();
                self.complete_action();
            }
        }
        true
    }

    pub fn tap(&mut self) {
        self.gesture(Gesture::Tap);
    }

    pub fn swipe(&mut self) {
        self.gesture(Gesture::Swipe);
    }

    /// Any discrete gesture. Counter actions count the gestures they accept;
    /// a tap also starts a wait-style action.
    pub fn gesture(&mut self, gesture: Gesture) {
        if !self.accepting() || !self.state.step_state().accepts_action_input() {
            return;
        }
        let Some(spec) = self.state.active_spec() else {
            return;
        };
        match spec.slot {
            Slot::Counter(kind) if spec.accepts(gesture) => {
                self.state.increment_counter(kind);
                self.begin_action();
                let now = self.now();
                self.emit_progress(now);
                if self.state.is_complete(now) {
                    self.complete_action();
                }
            }
            Slot::Timer(TimerKind::Wait) if gesture == Gesture::Tap => self.start_wait(),
            _ => trace!(%gesture, action = %spec.id, "gesture ignored"),
        }
    }

    pub fn hold_start(&mut self) {
        if !self.accepting() || !self.state.step_state().accepts_action_input() {
            return;
        }
        if self.state.timer_active(TimerKind::Hold) {
            return;
        }
        let now = self.now();
        if !self.state.start_timer(TimerKind::Hold, now) {
            return;
        }
        self.begin_action();
        self.schedule_tick(TickKind::Hold, now);
    }

    /// Clears the hold flag unconditionally, then completes the action if the
    /// hold already lasted long enough.
    pub fn hold_end(&mut self) {
        self.ticks.cancel_kind(TickKind::Hold);
        let now = self.now();
        if !self.state.stop_timer(TimerKind::Hold, now) {
            return;
        }
        if !self.accepting() || self.state.step_state() != StepState::ActionInProgress {
            return;
        }
        if self.state.is_complete(now) {
            self.complete_action();
        } else {
            debug!(
                elapsed_ms = self.state.elapsed(TimerKind::Hold, now),
                "hold released early"
            );
        }
    }

    /// Start a wait-style duration action.
    pub fn start_wait(&mut self) {
        if !self.accepting() || self.state.step_state() != StepState::ReadyAction {
            return;
        }
        let now = self.now();
        if !self.state.start_timer(TimerKind::Wait, now) {
            return;
        }
        self.begin_action();
        self.emit_remaining(now);
        self.schedule_tick(TickKind::Wait, now);
    }

    pub fn rotary_change(&mut self, value: f64) {
        self.value_change(ValueKind::Rotary, value);
    }

    pub fn slider_change(&mut self, value: f64) {
        self.value_change(ValueKind::Slider, value);
    }

    fn value_change(&mut self, kind: ValueKind, value: f64) {
        if !value.is_finite()
            || !self.accepting()
            || !self.state.step_state().accepts_action_input()
        {
            return;
        }
        if !self.state.set_value(kind, value) {
            return;
        }
        self.begin_action();
        let now = self.now();
        self.emit_progress(now);
        if self.state.is_complete(now) {
            self.complete_action();
        }
    }

    pub fn timing_start(&mut self) {
        if !self.accepting() || !self.state.step_state().accepts_action_input() {
            return;
        }
        if self.state.timer_active(TimerKind::Timing) {
            return;
        }
        let now = self.now();
        if !self.state.start_timer(TimerKind::Timing, now) {
            return;
        }
        self.begin_action();
        self.schedule_tick(TickKind::Timing, now);
    }

    pub fn timing_stop(&mut self) {
        if !self.accepting() || self.state.step_state() != StepState::ActionInProgress {
            return;
        }
        let now = self.now();
        if !self.state.stop_timer(TimerKind::Timing, now) {
            return;
        }
        self.ticks.cancel_kind(TickKind::Timing);
        self.finish_timing(now);
    }

    pub fn speaking_result(&mut self, correct: bool) {
        if !self.accepting() || self.state.step_state() != StepState::SpeakingCheck {
            return;
        }
        if self.ticks.is_scheduled(TickKind::Advance) {
            trace!("speech already accepted");
            return;
        }
        let phrase = self
            .state
            .current_step()
            .and_then(Step::speaking_phrase)
            .unwrap_or_default()
            .to_string();
        self.state.record_speaking(correct);
        self.emit(Notification::SpeakingResult {
            correct,
            phrase: phrase.clone(),
        });
        if correct {
            self.state.add_score(self.config.scoring.speaking_bonus);
            let now = self.now();
            let due = now.saturating_add(self.config.speaking_advance_delay_ms);
            self.ticks.schedule(TickKind::Advance, due);
        } else {
            self.emit(Notification::Hint {
                text: format!("Say: \"{}\"", phrase),
            });
        }
    }

    /// Leave SpeakingCheck for the next step without a bonus.
    pub fn skip_speaking(&mut self) {
        if !self.accepting() || self.state.step_state() != StepState::SpeakingCheck {
            return;
        }
        self.ticks.cancel_kind(TickKind::Advance);
        self.advance_step();
    }

    pub fn request_hint(&mut self) {
        if !self.running {
            return;
        }
        let text = self.hint_text();
        if !text.is_empty() {
            self.emit(Notification::Hint { text });
        }
    }

    // ========================================================================
    // Ticks
    // ========================================================================

    /// Fire every tick due on the clock. Returns how many fired.
    pub fn run_due(&mut self) -> usize {
        let now = self.now();
        let mut fired = 0;
        while let Some((_, kind)) = self.ticks.pop_due(now) {
            self.on_tick(kind);
            fired += 1;
        }
        fired
    }

    /// Fire the pending tick of `kind` now, whatever its due time.
    pub fn fire(&mut self, kind: TickKind) -> bool {
        if self.ticks.take(kind).is_none() {
            return false;
        }
        self.on_tick(kind);
        true
    }

    fn on_tick(&mut self, kind: TickKind) {
        match kind {
            TickKind::Hold | TickKind::Wait | TickKind::Timing => self.on_action_tick(kind),
            TickKind::SpeakingPrompt => self.on_speaking_prompt(),
            TickKind::Advance => self.on_advance(),
        }
    }

    fn on_action_tick(&mut self, kind: TickKind) {
        let Some(timer) = kind.timer() else {
            return;
        };
        if !self.accepting()
            || !self.state.timer_active(timer)
            || self.state.step_state() != StepState::ActionInProgress
        {
            trace!(?kind, "tick stopped");
            return;
        }
        let now = self.now();

        if timer == TimerKind::Timing {
            if let Some(ActionType::TimingWindow { total_ms, .. }) =
                self.state.active_action_type()
            {
                if self.state.elapsed(timer, now) > total_ms {
                    self.state.stop_timer(timer, now);
                    self.state.cap_timer(timer, total_ms);
                    debug!(total_ms, "timing overrun");
                    self.finish_timing(now);
                    return;
                }
            }
            self.emit_progress(now);
            self.schedule_tick(kind, now);
            return;
        }

        self.emit_progress(now);
        if timer == TimerKind::Wait {
            self.emit_remaining(now);
        }
        if self.state.is_complete(now) {
            self.complete_action();
        } else {
            self.schedule_tick(kind, now);
        }
    }

    fn on_speaking_prompt(&mut self) {
        if !self
            .state
            .compare_and_set(StepState::StepDone, StepState::SpeakingCheck)
        {
            return;
        }
        self.emit_state();
        let phrase = self
            .state
            .current_step()
            .and_then(Step::speaking_phrase)
            .unwrap_or_default()
            .to_string();
        self.emit(Notification::SpeakingRequired { phrase });
    }

    fn on_advance(&mut self) {
        if matches!(
            self.state.step_state(),
            StepState::StepDone | StepState::SpeakingCheck
        ) {
            self.advance_step();
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn begin_action(&mut self) {
        if self
            .state
            .compare_and_set(StepState::ReadyAction, StepState::ActionInProgress)
        {
            self.emit_state();
        }
    }

    /// The one path into StepDone. Returns false if the action was already
    /// completed (or never in progress).
    fn complete_action(&mut self) -> bool {
        if !self.state.try_finish_action() {
            trace!("completion already taken");
            return false;
        }
        let now = self.now();
        for timer in [TimerKind::Hold, TimerKind::Wait, TimerKind::Timing] {
            self.ticks.cancel_kind(TickKind::for_timer(timer));
            self.state.stop_timer(timer, now);
        }
        let Some(step) = self.state.current_step().cloned() else {
            return true;
        };
        self.emit(Notification::ActionComplete {
            action: step.action,
        });
        self.emit_state();
        self.emit(Notification::StepSuccess {
            text: step.success.clone(),
        });
        for id in &step.items {
            self.state.mark_processed(id);
        }
        self.state.add_score(self.config.scoring.step_bonus);
        info!(
            step = self.state.step_index() + 1,
            action = %step.action,
            score = self.state.score(),
            "step done"
        );

        if self.config.speech_practice && step.speaking_phrase().is_some() {
            let due = now.saturating_add(self.config.speaking_prompt_delay_ms);
            self.ticks.schedule(TickKind::SpeakingPrompt, due);
        } else {
            let due = now.saturating_add(self.config.step_done_delay_ms);
            self.ticks.schedule(TickKind::Advance, due);
        }
        true
    }

    fn finish_timing(&mut self, now: u64) {
        let elapsed_ms = self.state.elapsed(TimerKind::Timing, now);
        let perfect = self
            .state
            .active_action_type()
            .is_some_and(|action| is_perfect_stop(&action, elapsed_ms));
        self.emit(Notification::TimingResult {
            elapsed_ms,
            perfect,
        });
        self.emit_progress(now);
        if self.state.is_complete(now) {
            if perfect {
                self.state.add_score(self.config.scoring.perfect_timing_bonus);
                debug!(elapsed_ms, "perfect timing");
            }
            self.complete_action();
        } else {
            let text = self.hint_text();
            self.emit(Notification::Hint { text });
        }
    }

    fn advance_step(&mut self) {
        self.ticks.cancel_all();
        if self.state.advance() {
            debug!(step = self.state.step_index() + 1, "next step");
            self.announce_step();
        } else {
            self.emit_state();
            let score = self.state.score();
            info!(
                recipe = self.recipe_id.as_deref().unwrap_or_default(),
                score, "recipe complete"
            );
            self.emit(Notification::RecipeComplete { score });
        }
    }

    fn announce_step(&mut self) {
        let Some(step) = self.state.current_step().cloned() else {
            return;
        };
        self.emit(Notification::StepChanged {
            index: self.state.step_index(),
            total: self.state.total_steps(),
            step: step.clone(),
        });
        self.emit_state();
        self.emit(Notification::Instruction {
            text: step.instruction,
        });
    }

    fn transition_delay(&self, kind: TickKind) -> u64 {
        match kind {
            TickKind::SpeakingPrompt => self.config.speaking_prompt_delay_ms,
            TickKind::Advance if self.state.step_state() == StepState::SpeakingCheck => {
                self.config.speaking_advance_delay_ms
            }
            _ => self.config.step_done_delay_ms,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn accepting(&self) -> bool {
        self.running && !self.state.is_paused()
    }

    fn schedule_tick(&mut self, kind: TickKind, now: u64) {
        let interval = self.config.tick_interval_ms.max(1);
        self.ticks.schedule(kind, now.saturating_add(interval));
    }

    fn report(&mut self, err: EngineError) -> EngineError {
        warn!(error = %err, "cannot start recipe");
        self.emit(Notification::Error {
            message: err.to_string(),
        });
        err
    }

    fn emit(&mut self, notification: Notification) {
        if let Some(sink) = self.sink.as_mut() {
            sink.notify(&notification);
        }
    }

    fn emit_state(&mut self) {
        let state = self.state.step_state();
        self.emit(Notification::StepStateChanged { state });
    }

    fn emit_progress(&mut self, now: u64) {
        let Some(spec) = self.state.active_spec() else {
            return;
        };
        let progress = self.state.progress(now);
        self.emit(Notification::ActionProgress {
            action: spec.id,
            progress,
        });
    }

    fn emit_remaining(&mut self, now: u64) {
        if let Some(ActionType::Duration { target_ms }) = self.state.active_action_type() {
            let remaining_ms = target_ms.saturating_sub(self.state.elapsed(TimerKind::Wait, now));
            self.emit(Notification::TimerRemaining { remaining_ms });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cookbook::RecipeBook;
    use crate::core::events::RecordingSink;
    use crate::core::scheduler::ManualClock;

    struct Harness {
        engine: StepEngine,
        clock: ManualClock,
        sink: RecordingSink,
    }

    impl Harness {
        fn new(recipe_yaml: &str) -> Self {
            Self::with_config(recipe_yaml, EngineConfig::default())
        }

        fn with_config(recipe_yaml: &str, config: EngineConfig) -> Self {
            let mut book = RecipeBook::new();
            book.insert("r", serde_yaml_ng::from_str(recipe_yaml).unwrap());
            let clock = ManualClock::new();
            let sink = RecordingSink::new();
            let engine = StepEngine::new(config, Arc::new(book), Box::new(clock.clone()))
                .with_sink(Box::new(sink.clone()));
            Self {
                engine,
                clock,
                sink,
            }
        }

        fn start(mut self) -> Self {
            self.engine.start_recipe("r").unwrap();
            self
        }

        /// Advance the clock in tick-sized steps, firing due ticks.
        fn run_for(&mut self, ms: u64) {
            let end = self.clock.now_ms() + ms;
            while let Some(due) = self.engine.next_due() {
                if due > end {
                    break;
                }
                self.clock.set(due.max(self.clock.now_ms()));
                self.engine.run_due();
            }
            self.clock.set(end);
        }

        fn progress_count(&self) -> usize {
            self.sink
                .count(|n| matches!(n, Notification::ActionProgress { .. }))
        }
    }

    const ONION: &str = r#"
name: Onion
steps:
  - instruction: Cut the onion.
    action: tap_to_cut
    zone: cutting_board
    items: [onion]
    params: { tap_count: 3 }
"#;

    const BOARD: &str = r#"
name: Board
steps:
  - instruction: Put a, b and the knife on the board.
    action: drag_to_zone
    zone: cutting_board
    items: [a, b]
    tool: knife
  - instruction: Cut.
    action: tap_to_cut
    zone: cutting_board
"#;

    const POUR: &str = r#"
name: Pour
steps:
  - instruction: Pour the water.
    action: pour
    zone: pot
    params: { pour_time_ms: 1000 }
"#;

    const EGG: &str = r#"
name: Egg
steps:
  - instruction: Stop at one second.
    action: timing_stop
    zone: pan
    params:
      timing: { total_ms: 2000, perfect_start_ms: 900, perfect_end_ms: 1100, accept_any_stop: true }
"#;

    #[test]
    fn test_sc007_counter_scenario() {
        let mut h = Harness::new(ONION).start();
        assert_eq!(h.engine.step_state(), StepState::ReadyAction);
        assert!(h.engine.drop_item("onion", Zone::CuttingBoard));
        assert_eq!(h.engine.step_state(), StepState::ReadyAction);
        h.engine.tap();
        h.engine.tap();
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        assert_eq!(
            h.sink.count(|n| matches!(n, Notification::ActionComplete { .. })),
            0
        );
        h.engine.tap();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        h.run_for(2_000);
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
        assert_eq!(h.engine.score(), 20);

        let names: Vec<&str> = h
            .sink
            .notifications()
            .iter()
            .map(Notification::name)
            .filter(|n| matches!(*n, "action_complete" | "step_state_changed" | "recipe_complete"))
            .collect();
        assert_eq!(
            names[names.len() - 4..],
            [
                "action_complete",
                "step_state_changed",
                "step_state_changed",
                "recipe_complete"
            ]
        );
        assert_eq!(
            h.sink.states(),
            vec![
                StepState::ReadyAction,
                StepState::ActionInProgress,
                StepState::StepDone,
                StepState::RecipeDone
            ]
        );
        assert!(h.engine.state().is_processed("onion"));
    }

    #[test]
    fn test_sc007_zone_fill_transitions_once_on_last_drop() {
        let mut h = Harness::new(BOARD).start();
        assert_eq!(h.engine.step_state(), StepState::WaitingItem);
        assert!(h.engine.drop_item("a", Zone::CuttingBoard));
        assert_eq!(h.engine.step_state(), StepState::WaitingItem);
        assert!(h.engine.drop_item("b", Zone::CuttingBoard));
        assert_eq!(h.engine.step_state(), StepState::WaitingItem);
        assert_eq!(
            h.sink
                .count(|n| *n == Notification::StepStateChanged { state: StepState::ReadyAction }),
            0
        );
        assert!(h.engine.drop_item("knife", Zone::CuttingBoard));
        assert_eq!(
            h.sink
                .count(|n| *n == Notification::StepStateChanged { state: StepState::ReadyAction }),
            1
        );
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        h.run_for(2_000);
        assert_eq!(h.engine.progress_text(), "Step 2 / 2");
    }

    #[test]
    fn test_sc007_rejected_drops_do_not_mutate() {
        let mut h = Harness::new(BOARD).start();
        assert!(!h.engine.drop_item("a", Zone::Pot));
        assert!(!h.engine.drop_item("garlic", Zone::CuttingBoard));
        assert_eq!(h.engine.state().zone_count(Zone::Pot, "a"), 0);
        assert_eq!(h.engine.state().zone_count(Zone::CuttingBoard, "garlic"), 0);
        assert_eq!(
            h.sink.count(|n| matches!(n, Notification::ItemPlaced { .. })),
            0
        );
    }

    #[test]
    fn test_sc007_duplicate_drops_do_not_block() {
        let mut h = Harness::new(BOARD).start();
        for item in ["a", "a", "b", "b", "knife"] {
            h.engine.drop_item(item, Zone::CuttingBoard);
        }
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.state().zone_count(Zone::CuttingBoard, "a"), 2);
    }

    #[test]
    fn test_sc007_hold_released_early() {
        let mut h = Harness::new(POUR).start();
        h.engine.hold_start();
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        h.run_for(500);
        let before = h.progress_count();
        assert!(before > 0);
        h.engine.hold_end();
        assert!(!h.engine.is_scheduled(TickKind::Hold));
        h.run_for(5_000);
        assert_eq!(h.progress_count(), before);
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        assert_eq!(h.engine.score(), 0);
    }

    #[test]
    fn test_sc007_hold_completes_on_tick() {
        let mut h = Harness::new(POUR).start();
        h.engine.hold_start();
        h.run_for(1_000);
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.score(), 20);
        h.engine.hold_end();
        assert_eq!(h.engine.score(), 20);
        h.run_for(2_000);
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
    }

    #[test]
    fn test_sc007_hold_end_completes_between_ticks() {
        let config = EngineConfig {
            tick_interval_ms: 400,
            ..EngineConfig::default()
        };
        let mut h = Harness::with_config(POUR, config).start();
        h.engine.hold_start();
        h.run_for(800);
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        h.clock.advance(250);
        h.engine.hold_end();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.score(), 20);
    }

    #[test]
    fn test_sc007_tick_observes_cleared_flag() {
        let mut h = Harness::new(POUR).start();
        h.engine.hold_start();
        h.clock.advance(100);
        h.engine.hold_end();
        // A tick that slipped past cancellation must still stop itself.
        h.engine.ticks.schedule(TickKind::Hold, 200);
        let before = h.progress_count();
        assert!(h.engine.fire(TickKind::Hold));
        assert_eq!(h.progress_count(), before);
        assert!(!h.engine.is_scheduled(TickKind::Hold));
    }

    #[test]
    fn test_sc007_completion_race_scores_once() {
        let mut h = Harness::new(POUR).start();
        h.engine.hold_start();
        h.clock.advance(1_000);
        assert!(h.engine.state.is_complete(h.clock.now_ms()));
        assert!(h.engine.complete_action());
        assert!(!h.engine.complete_action());
        h.engine.hold_end();
        assert!(!h.engine.fire(TickKind::Hold));
        assert_eq!(h.engine.score(), 20);
        assert_eq!(
            h.sink.count(|n| matches!(n, Notification::ActionComplete { .. })),
            1
        );
    }

    #[test]
    fn test_sc007_timing_perfect_bonus() {
        let mut h = Harness::new(EGG).start();
        h.engine.timing_start();
        h.run_for(1_000);
        h.engine.timing_stop();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.score(), 40);
        assert!(h.sink.notifications().contains(&Notification::TimingResult {
            elapsed_ms: 1_000,
            perfect: true
        }));
    }

    #[test]
    fn test_sc007_timing_accept_any_stop_no_bonus() {
        let mut h = Harness::new(EGG).start();
        h.engine.timing_start();
        h.run_for(400);
        h.engine.timing_stop();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.score(), 20);
    }

    #[test]
    fn test_sc007_timing_strict_miss_allows_retry() {
        let yaml = EGG.replace("accept_any_stop: true", "accept_any_stop: false");
        let mut h = Harness::new(&yaml).start();
        h.engine.timing_start();
        h.run_for(400);
        h.engine.timing_stop();
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        assert_eq!(h.engine.score(), 0);
        h.engine.timing_start();
        h.run_for(950);
        h.engine.timing_stop();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.score(), 40);
    }

    #[test]
    fn test_sc007_timing_overrun_auto_stops() {
        let mut h = Harness::new(EGG).start();
        h.engine.timing_start();
        h.run_for(3_000);
        assert!(!h.engine.is_scheduled(TickKind::Timing));
        assert_eq!(h.engine.score(), 20);
        assert!(h.sink.notifications().contains(&Notification::TimingResult {
            elapsed_ms: 2_000,
            perfect: false
        }));
    }

    #[test]
    fn test_sc007_wait_action_counts_down() {
        let yaml = r#"
name: Boil
steps:
  - instruction: Wait for the water.
    action: wait_boil
    zone: pot
    params: { warm_up_ms: 500 }
"#;
        let mut h = Harness::new(yaml).start();
        h.engine.tap();
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        h.run_for(300);
        assert!(h
            .sink
            .notifications()
            .contains(&Notification::TimerRemaining { remaining_ms: 200 }));
        h.run_for(200);
        assert_eq!(h.engine.step_state(), StepState::StepDone);
    }

    #[test]
    fn test_sc007_ranged_value() {
        let yaml = r#"
name: Heat
steps:
  - instruction: Set the oven.
    action: rotate_knob_temp
    zone: oven
"#;
        let mut h = Harness::new(yaml).start();
        h.engine.slider_change(0.7);
        assert_eq!(h.engine.step_state(), StepState::ReadyAction);
        h.engine.rotary_change(120.0);
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        h.engine.rotary_change(f64::NAN);
        h.engine.rotary_change(175.0);
        assert_eq!(h.engine.step_state(), StepState::StepDone);
    }

    #[test]
    fn test_sc007_speaking_flow() {
        let yaml = r#"
name: Say
steps:
  - instruction: Stir.
    action: swipe_to_stir
    zone: pot
    params: { swipe_count: 1 }
    phrase: stir the soup
  - instruction: Stir again.
    action: swipe_to_stir
    zone: pot
    params: { swipe_count: 1 }
"#;
        let mut h = Harness::new(yaml).start();
        h.engine.swipe();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        h.run_for(1_500);
        assert_eq!(h.engine.step_state(), StepState::SpeakingCheck);
        assert_eq!(h.engine.hint_text(), "Say: \"stir the soup\"");
        h.engine.speaking_result(false);
        assert_eq!(h.engine.step_state(), StepState::SpeakingCheck);
        h.engine.speaking_result(true);
        h.engine.speaking_result(true);
        assert_eq!(h.engine.score(), 30);
        assert_eq!(h.engine.state().speaking_attempts(), 2);
        assert_eq!(h.engine.state().speaking_correct(), 1);
        h.run_for(1_500);
        assert_eq!(h.engine.state().step_index(), 1);
        assert_eq!(h.engine.step_state(), StepState::ReadyAction);
    }

    #[test]
    fn test_sc007_skip_speaking() {
        let yaml = r#"
name: Say
steps:
  - instruction: Crack.
    action: tap_to_crack
    zone: mixing_bowl
    params: { tap_count: 1 }
    phrase: crack the egg
"#;
        let mut h = Harness::new(yaml).start();
        h.engine.tap();
        h.engine.skip_speaking();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        h.run_for(1_500);
        h.engine.skip_speaking();
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
        assert_eq!(h.engine.score(), 20);
    }

    #[test]
    fn test_sc007_speech_practice_disabled() {
        let yaml = r#"
name: Say
steps:
  - instruction: Crack.
    action: tap_to_crack
    zone: mixing_bowl
    params: { tap_count: 1 }
    phrase: crack the egg
"#;
        let config = EngineConfig {
            speech_practice: false,
            ..EngineConfig::default()
        };
        let mut h = Harness::with_config(yaml, config).start();
        h.engine.tap();
        h.run_for(2_000);
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
    }

    #[test]
    fn test_sc007_pause_excludes_paused_time() {
        let mut h = Harness::new(POUR).start();
        h.engine.hold_start();
        h.run_for(400);
        h.engine.pause();
        assert!(h.engine.next_due().is_none());
        let before = h.progress_count();
        h.run_for(10_000);
        assert_eq!(h.progress_count(), before);
        h.engine.tap();
        h.engine.resume();
        assert!(h.engine.is_scheduled(TickKind::Hold));
        h.run_for(500);
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        h.run_for(100);
        assert_eq!(h.engine.step_state(), StepState::StepDone);
    }

    #[test]
    fn test_sc007_hold_end_while_paused_stops_loop() {
        let mut h = Harness::new(POUR).start();
        h.engine.hold_start();
        h.run_for(300);
        h.engine.pause();
        h.engine.hold_end();
        h.engine.resume();
        assert!(!h.engine.is_scheduled(TickKind::Hold));
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
    }

    #[test]
    fn test_sc007_hold_finished_while_paused_completes_on_resume() {
        let config = EngineConfig {
            tick_interval_ms: 400,
            ..EngineConfig::default()
        };
        let mut h = Harness::with_config(POUR, config).start();
        h.engine.hold_start();
        h.run_for(800);
        h.clock.advance(250);
        h.engine.pause();
        h.engine.hold_end();
        assert_eq!(h.engine.step_state(), StepState::ActionInProgress);
        h.engine.resume();
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.score(), 20);
        assert!(!h.engine.is_scheduled(TickKind::Hold));
        h.run_for(10_000);
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
        assert_eq!(h.engine.score(), 20);
    }

    #[test]
    fn test_sc007_extreme_delays_saturate() {
        let config = EngineConfig {
            tick_interval_ms: u64::MAX,
            step_done_delay_ms: u64::MAX,
            speaking_prompt_delay_ms: u64::MAX,
            speaking_advance_delay_ms: u64::MAX,
            ..EngineConfig::default()
        };
        let mut h = Harness::with_config(ONION, config).start();
        h.clock.set(1_000);
        for _ in 0..3 {
            h.engine.tap();
        }
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        assert_eq!(h.engine.next_due(), Some(u64::MAX));
        h.engine.pause();
        h.engine.resume();
        assert_eq!(h.engine.next_due(), Some(u64::MAX));
        assert!(h.engine.fire(TickKind::Advance));
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
    }

    #[test]
    fn test_sc007_extreme_bonus_saturates() {
        let mut config = EngineConfig::default();
        config.scoring.step_bonus = u32::MAX;
        config.scoring.perfect_timing_bonus = u32::MAX;
        let mut h = Harness::with_config(EGG, config).start();
        h.engine.timing_start();
        h.run_for(1_000);
        h.engine.timing_stop();
        assert_eq!(h.engine.score(), u32::MAX);
    }

    #[test]
    fn test_sc007_only_items_are_marked_processed() {
        let mut h = Harness::new(BOARD).start();
        for item in ["a", "b", "knife"] {
            h.engine.drop_item(item, Zone::CuttingBoard);
        }
        assert!(h.engine.state().is_processed("a"));
        assert!(h.engine.state().is_processed("b"));
        assert!(!h.engine.state().is_processed("knife"));
    }

    #[test]
    fn test_sc007_pause_defers_step_transition() {
        let mut h = Harness::new(ONION).start();
        for _ in 0..3 {
            h.engine.tap();
        }
        h.run_for(1_000);
        h.engine.pause();
        h.run_for(10_000);
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        h.engine.resume();
        h.run_for(1_999);
        assert_eq!(h.engine.step_state(), StepState::StepDone);
        h.run_for(1);
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
    }

    #[test]
    fn test_sc007_unknown_recipe_reports_error() {
        let mut h = Harness::new(ONION);
        let err = h.engine.start_recipe("pie").unwrap_err();
        assert_eq!(err, EngineError::RecipeNotFound("pie".to_string()));
        assert!(!h.engine.is_running());
        assert_eq!(
            h.sink.notifications(),
            vec![Notification::Error {
                message: "recipe not found: pie".to_string()
            }]
        );
        h.engine.tap();
        assert_eq!(h.sink.len(), 1);
    }

    #[test]
    fn test_sc007_teardown_is_idempotent() {
        let mut h = Harness::new(POUR).start();
        h.engine.hold_start();
        h.engine.teardown();
        h.engine.teardown();
        assert!(h.engine.next_due().is_none());
        let before = h.sink.len();
        h.engine.hold_start();
        h.engine.request_hint();
        h.run_for(2_000);
        assert_eq!(h.sink.len(), before);
        assert!(!h.engine.is_running());
    }

    #[test]
    fn test_sc007_restart_resets_session() {
        let mut h = Harness::new(ONION).start();
        for _ in 0..3 {
            h.engine.tap();
        }
        assert_eq!(h.engine.score(), 20);
        h.engine.restart().unwrap();
        assert_eq!(h.engine.score(), 0);
        assert_eq!(h.engine.step_state(), StepState::ReadyAction);
        assert!(h.engine.next_due().is_none());
    }

    #[test]
    fn test_sc007_stale_inputs_ignored() {
        let mut h = Harness::new(BOARD).start();
        h.engine.tap();
        h.engine.hold_start();
        h.engine.timing_stop();
        h.engine.speaking_result(true);
        assert_eq!(h.engine.step_state(), StepState::WaitingItem);
        assert_eq!(h.engine.score(), 0);
        assert!(h.engine.next_due().is_none());
    }

    #[test]
    fn test_sc007_hints_follow_state() {
        let mut h = Harness::new(BOARD).start();
        assert_eq!(
            h.engine.hint_text(),
            "Drag the a, b and knife to the Cutting Board"
        );
        h.engine.drop_item("a", Zone::CuttingBoard);
        h.engine.request_hint();
        assert!(h.sink.notifications().contains(&Notification::Hint {
            text: "Drag the b and knife to the Cutting Board".to_string()
        }));
        h.engine.drop_item("b", Zone::CuttingBoard);
        h.engine.drop_item("knife", Zone::CuttingBoard);
        assert_eq!(h.engine.hint_text(), "Great job!");
        h.run_for(2_000);
        h.engine.tap();
        assert_eq!(h.engine.hint_text(), "Tap to cut (1/5)");
    }

    #[test]
    fn test_sc007_full_sequence_score() {
        let yaml = r#"
name: Three
steps:
  - instruction: One.
    action: tap_to_pound
    zone: cutting_board
    params: { tap_count: 2 }
  - instruction: Two.
    action: shake_pan
    zone: pan
    params: { shake_count: 2 }
  - instruction: Three.
    action: serve
    zone: plate
"#;
        let mut h = Harness::new(yaml).start();
        h.engine.tap();
        h.engine.tap();
        h.run_for(2_000);
        h.engine.gesture(Gesture::Shake);
        h.engine.swipe();
        h.run_for(2_000);
        assert!(h.engine.drop_item("soup", Zone::Plate));
        h.run_for(2_000);
        assert_eq!(h.engine.step_state(), StepState::RecipeDone);
        assert_eq!(
            h.sink
                .count(|n| *n == Notification::StepStateChanged { state: StepState::StepDone }),
            3
        );
        assert_eq!(h.engine.score(), 3 * 20);
        assert!(h
            .sink
            .notifications()
            .contains(&Notification::RecipeComplete { score: 60 }));
    }
}
