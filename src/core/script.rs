//! SC-008: Scripted input and deterministic simulation.
//!
//! A script is a YAML list of timed inputs. [`simulate`] replays it against a
//! [`StepEngine`] on a [`ManualClock`], firing every tick that falls due
//! between two inputs, so a run is reproducible to the millisecond.

use super::catalog::ActionCatalog;
use super::cookbook::RecipeSource;
use super::engine::StepEngine;
use super::error::{EngineError, ScriptError};
use super::events::{RecordingSink, Stamped};
use super::scheduler::{Clock, ManualClock};
use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

/// One engine input at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub input: Input,
}

impl ScriptEvent {
    pub fn new(at_ms: u64, input: Input) -> Self {
        Self { at_ms, input }
    }
}

/// Engine input, tagged by `input:` in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum Input {
    Drop { item: ItemId, zone: Zone },
    Tap,
    Swipe,
    Gesture { gesture: Gesture },
    HoldStart,
    HoldEnd,
    StartWait,
    Rotary { value: f64 },
    Slider { value: f64 },
    TimingStart,
    TimingStop,
    Speech { correct: bool },
    SkipSpeaking,
    Pause,
    Resume,
    Hint,
}

impl Input {
    pub fn apply(&self, engine: &mut StepEngine) {
        match self {
            Self::Drop { item, zone } => {
                engine.drop_item(item, *zone);
            }
            Self::Tap => engine.tap(),
            Self::Swipe => engine.swipe(),
            Self::Gesture { gesture } => engine.gesture(*gesture),
            Self::HoldStart => engine.hold_start(),
            Self::HoldEnd => engine.hold_end(),
            Self::StartWait => engine.start_wait(),
            Self::Rotary { value } => engine.rotary_change(*value),
            Self::Slider { value } => engine.slider_change(*value),
            Self::TimingStart => engine.timing_start(),
            Self::TimingStop => engine.timing_stop(),
            Self::Speech { correct } => engine.speaking_result(*correct),
            Self::SkipSpeaking => engine.skip_speaking(),
            Self::Pause => engine.pause(),
            Self::Resume => engine.resume(),
            Self::Hint => engine.request_hint(),
        }
    }
}

pub fn parse_script(yaml: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptEvent>, ScriptError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&content)
}

// ============================================================================
// Simulation
// ============================================================================

/// Outcome of one simulated run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub recipe: String,
    pub notifications: Vec<Stamped>,
    pub final_state: StepState,
    pub score: u32,
    pub steps_completed: u32,
    pub total_steps: usize,
    pub ended_at_ms: u64,
}

impl SimulationReport {
    pub fn finished(&self) -> bool {
        self.final_state == StepState::RecipeDone
    }
}

/// Replay `script` against recipe `recipe_id`, then let ticks run for
/// `settle_ms` after the last input.
pub fn simulate(
    recipes: Arc<dyn RecipeSource>,
    config: &EngineConfig,
    recipe_id: &str,
    script: &[ScriptEvent],
    settle_ms: u64,
) -> Result<SimulationReport, EngineError> {
    let clock = ManualClock::new();
    let sink = RecordingSink::with_clock(Rc::new(clock.clone()));
    let mut engine = StepEngine::new(config.clone(), recipes, Box::new(clock.clone()))
        .with_sink(Box::new(sink.clone()));
    engine.start_recipe(recipe_id)?;

    let mut events: Vec<&ScriptEvent> = script.iter().collect();
    events.sort_by_key(|e| e.at_ms);
    for event in events {
        run_until(&mut engine, &clock, event.at_ms);
        event.input.apply(&mut engine);
    }
    let end = clock.now_ms().saturating_add(settle_ms);
    run_until(&mut engine, &clock, end);

    let report = SimulationReport {
        recipe: recipe_id.to_string(),
        notifications: sink.stamped(),
        final_state: engine.step_state(),
        score: engine.score(),
        steps_completed: engine.state().steps_completed(),
        total_steps: engine.state().total_steps(),
        ended_at_ms: clock.now_ms(),
    };
    engine.teardown();
    Ok(report)
}

/// Fire due ticks in deadline order up to `until_ms`, then leave the clock there.
pub fn run_until(engine: &mut StepEngine, clock: &ManualClock, until_ms: u64) {
    while let Some(due) = engine.next_due() {
        if due > until_ms {
            break;
        }
        clock.set(due.max(clock.now_ms()));
        engine.run_due();
    }
    if until_ms > clock.now_ms() {
        clock.set(until_ms);
    }
}

// ============================================================================
// Ideal scripts
// ============================================================================

/// Script that completes every step of `recipe` on the first try, answers
/// every speech check correctly and stops every timer mid-window.
pub fn perfect_run(recipe: &Recipe, config: &EngineConfig) -> Vec<ScriptEvent> {
    let margin = config.tick_interval_ms.max(1);
    let mut script = Vec::new();
    let mut t: u64 = 0;

    for step in &recipe.steps {
        let spec = ActionCatalog::spec(step.action);
        let mut required: Vec<&str> = step.items.iter().map(String::as_str).collect();
        required.extend(step.tool.as_deref());
        required.dedup();
        if required.is_empty() && spec.slot == Slot::Zone {
            required.push("dish");
        }
        for item in required {
            script.push(ScriptEvent::new(
                t,
                Input::Drop {
                    item: item.to_string(),
                    zone: step.zone,
                },
            ));
        }

        match (spec.slot, ActionCatalog::action_type(step)) {
            (Slot::Counter(_), ActionType::Counter { target }) => {
                let gesture = spec.gestures.first().copied().unwrap_or(Gesture::Tap);
                for _ in 0..target.max(1) {
                    script.push(ScriptEvent::new(t, Input::Gesture { gesture }));
                }
            }
            (Slot::Timer(TimerKind::Hold), ActionType::Duration { target_ms }) => {
                script.push(ScriptEvent::new(t, Input::HoldStart));
                t = t.saturating_add(target_ms).saturating_add(margin);
                script.push(ScriptEvent::new(t, Input::HoldEnd));
            }
            (Slot::Timer(TimerKind::Wait), ActionType::Duration { target_ms }) => {
                script.push(ScriptEvent::new(t, Input::StartWait));
                t = t.saturating_add(target_ms).saturating_add(margin);
            }
            (
                Slot::Timer(TimerKind::Timing),
                ActionType::TimingWindow {
                    perfect_start_ms,
                    perfect_end_ms,
                    ..
                },
            ) => {
                script.push(ScriptEvent::new(t, Input::TimingStart));
                let mid = perfect_end_ms.saturating_sub(perfect_start_ms) / 2;
                t = t.saturating_add(perfect_start_ms).saturating_add(mid);
                script.push(ScriptEvent::new(t, Input::TimingStop));
            }
            (Slot::Value(ValueKind::Rotary), ActionType::RangedValue { target, .. }) => {
                script.push(ScriptEvent::new(t, Input::Rotary { value: target }));
            }
            (Slot::Value(ValueKind::Slider), ActionType::RangedValue { target, .. }) => {
                script.push(ScriptEvent::new(t, Input::Slider { value: target }));
            }
            _ => {}
        }

        if config.speech_practice && step.speaking_phrase().is_some() {
            t = t
                .saturating_add(config.speaking_prompt_delay_ms)
                .saturating_add(margin);
            script.push(ScriptEvent::new(t, Input::Speech { correct: true }));
            t = t
                .saturating_add(config.speaking_advance_delay_ms)
                .saturating_add(margin);
        } else {
            t = t.saturating_add(config.step_done_delay_ms).saturating_add(margin);
        }
    }
    script
}

/// Score a [`perfect_run`] of `recipe` earns.
pub fn perfect_score(recipe: &Recipe, config: &EngineConfig) -> u32 {
    let scoring = &config.scoring;
    recipe
        .steps
        .iter()
        .map(|step| {
            let mut points = scoring.step_bonus;
            if ActionCatalog::spec(step.action).category == ActionCategory::TimingWindow {
                points = points.saturating_add(scoring.perfect_timing_bonus);
            }
            if config.speech_practice && step.speaking_phrase().is_some() {
                points = points.saturating_add(scoring.speaking_bonus);
            }
            points
        })
        .fold(0, u32::saturating_add)
}
