//! SC-003: Action catalog.
//!
//! Static taxonomy mapping every [`ActionId`] to its completion category, the
//! session slot that drives it, the gestures it accepts and its base hint.
//! Progress, completion and hint text are defined once per category in
//! [`CATEGORY_TABLE`]; the engine never branches on individual action ids.

use super::types::*;

/// Static description of one action.
#[derive(Debug)]
pub struct ActionSpec {
    pub id: ActionId,
    pub category: ActionCategory,
    pub slot: Slot,
    /// Gestures that advance a counter action (empty for everything else)
    pub gestures: &'static [Gesture],
    pub hint: &'static str,
}

impl ActionSpec {
    pub fn accepts(&self, gesture: Gesture) -> bool {
        self.gestures.contains(&gesture)
    }

    /// Resolve the step's parameters into this action's completion rule.
    pub fn action_type(&self, params: &ActionParams) -> ActionType {
        match self.slot {
            Slot::Counter(kind) => ActionType::Counter {
                target: match kind {
                    CounterKind::Tap => params.tap_count,
                    CounterKind::Stir => params.swipe_count,
                    CounterKind::Shake => params.shake_count,
                    CounterKind::Circle => params.circle_count,
                    CounterKind::Knead => params.knead_repeats,
                    CounterKind::Flip => params.flip_count,
                    CounterKind::Snap => params.snap_point_count,
                },
            },
            Slot::Timer(TimerKind::Hold) => ActionType::Duration {
                target_ms: if self.id == ActionId::Pour {
                    params.pour_time_ms
                } else {
                    params.hold_ms
                },
            },
            Slot::Timer(TimerKind::Wait) => ActionType::Duration {
                target_ms: if self.id == ActionId::WaitCook {
                    params.cook_time_ms
                } else {
                    params.warm_up_ms
                },
            },
            Slot::Timer(TimerKind::Timing) => ActionType::TimingWindow {
                total_ms: params.timing.total_ms,
                perfect_start_ms: params.timing.perfect_start_ms,
                perfect_end_ms: params.timing.perfect_end_ms,
                accept_any_stop: params.timing.accept_any_stop,
            },
            Slot::Value(ValueKind::Rotary) => ActionType::RangedValue {
                min: params.rotary.min,
                max: params.rotary.max,
                target: params.rotary.target,
                tolerance: params.rotary.tolerance,
            },
            Slot::Value(ValueKind::Slider) => ActionType::RangedValue {
                min: params.slider.min,
                max: params.slider.max,
                target: params.slider.target,
                tolerance: params.slider.tolerance,
            },
            Slot::Zone => ActionType::ZoneFill,
        }
    }
}

const NONE: &[Gesture] = &[];
const TAP: &[Gesture] = &[Gesture::Tap];
const SWIPE: &[Gesture] = &[Gesture::Swipe];
const SHAKE: &[Gesture] = &[Gesture::Shake, Gesture::Swipe];
const CIRCLE: &[Gesture] = &[Gesture::Circle];
const KNEAD: &[Gesture] = &[Gesture::Knead];
const FLIP: &[Gesture] = &[Gesture::Flip, Gesture::Swipe];
const SNAP: &[Gesture] = &[Gesture::Snap];

macro_rules! action {
    ($id:ident, $cat:ident, $slot:expr, $gestures:expr, $hint:literal) => {
        ActionSpec {
            id: ActionId::$id,
            category: ActionCategory::$cat,
            slot: $slot,
            gestures: $gestures,
            hint: $hint,
        }
    };
}

const TAPS: Slot = Slot::Counter(CounterKind::Tap);
const STIRS: Slot = Slot::Counter(CounterKind::Stir);
const SHAKES: Slot = Slot::Counter(CounterKind::Shake);
const CIRCLES: Slot = Slot::Counter(CounterKind::Circle);
const KNEADS: Slot = Slot::Counter(CounterKind::Knead);
const FLIPS: Slot = Slot::Counter(CounterKind::Flip);
const SNAPS: Slot = Slot::Counter(CounterKind::Snap);
const HOLD: Slot = Slot::Timer(TimerKind::Hold);
const WAIT: Slot = Slot::Timer(TimerKind::Wait);
const TIMING: Slot = Slot::Timer(TimerKind::Timing);
const ROTARY: Slot = Slot::Value(ValueKind::Rotary);
const SLIDER: Slot = Slot::Value(ValueKind::Slider);

/// One row per action, in [`ActionId::ALL`] order.
pub static ACTIONS: [ActionSpec; 30] = [
    action!(DragToZone, ZoneFill, Slot::Zone, NONE, "Drag to the zone"),
    action!(Serve, ZoneFill, Slot::Zone, NONE, "Drag the dish to serve"),
    action!(TapToCut, Counter, TAPS, TAP, "Tap to cut"),
    action!(TapToPound, Counter, TAPS, TAP, "Tap to pound"),
    action!(VentSteamTap, Counter, TAPS, TAP, "Tap to release the steam"),
    action!(TapToCrack, Counter, TAPS, TAP, "Tap to crack"),
    action!(TapToDrizzle, Counter, TAPS, TAP, "Tap to drizzle"),
    action!(SwipeToStir, Counter, STIRS, SWIPE, "Swipe to stir"),
    action!(WipeFogSwipe, Counter, STIRS, SWIPE, "Swipe to wipe the fog"),
    action!(SkimFoamSwipe, Counter, STIRS, SWIPE, "Swipe to skim the foam"),
    action!(ShakePan, Counter, SHAKES, SHAKE, "Shake the pan"),
    action!(ShakeBasket, Counter, SHAKES, SHAKE, "Shake the basket"),
    action!(SeasonShake, Counter, SHAKES, SHAKE, "Shake to season"),
    action!(WhiskCircles, Counter, CIRCLES, CIRCLE, "Draw circles to whisk"),
    action!(KneadDrag, Counter, KNEADS, KNEAD, "Drag to knead the dough"),
    action!(GrillFlipSwipe, Counter, FLIPS, FLIP, "Swipe to flip"),
    action!(GarnishDragSnap, Counter, SNAPS, SNAP, "Drag the garnish onto the dish"),
    action!(Pour, Duration, HOLD, NONE, "Hold to pour"),
    action!(OvenPreheatHold, Duration, HOLD, NONE, "Hold to preheat the oven"),
    action!(GrillOnHold, Duration, HOLD, NONE, "Hold to light the grill"),
    action!(SteamStart, Duration, HOLD, NONE, "Hold to start the steamer"),
    action!(WaitCook, Duration, WAIT, NONE, "Wait while it cooks"),
    action!(WaitOilHeat, Duration, WAIT, NONE, "Wait for the oil to heat"),
    action!(WaitBoil, Duration, WAIT, NONE, "Wait for the water to boil"),
    action!(WaitSear, Duration, WAIT, NONE, "Wait while it sears"),
    action!(RotateKnobTemp, RangedValue, ROTARY, NONE, "Turn the knob to set the temperature"),
    action!(RotateKnobTimer, RangedValue, ROTARY, NONE, "Turn the knob to set the timer"),
    action!(OilLevelSlider, RangedValue, SLIDER, NONE, "Slide to set the oil level"),
    action!(HeatLevelSlider, RangedValue, SLIDER, NONE, "Slide to set the heat"),
    action!(TimingStop, TimingWindow, TIMING, NONE, "Press STOP at the right moment"),
];

/// Read-only view of the session slots one action's formulas need.
#[derive(Debug, Clone)]
pub struct ActionSnapshot {
    pub spec: &'static ActionSpec,
    pub action: ActionType,
    pub count: u32,
    pub elapsed_ms: u64,
    /// Timer was started and has since been stopped
    pub stopped: bool,
    /// Last reported rotary/slider value
    pub value: Option<f64>,
    pub zone: Zone,
    pub zone_required: usize,
    /// Labels of required items/tool not yet in the zone
    pub zone_missing: Vec<String>,
}

/// Per-category (progress, complete, hint) triple.
pub struct CategoryRow {
    pub category: ActionCategory,
    pub progress: fn(&ActionSnapshot) -> f64,
    pub complete: fn(&ActionSnapshot) -> bool,
    pub hint: fn(&ActionSnapshot) -> String,
}

/// Indexed by [`ActionCategory::index`].
pub static CATEGORY_TABLE: [CategoryRow; 5] = [
    CategoryRow {
        category: ActionCategory::Counter,
        progress: counter_progress,
        complete: counter_complete,
        hint: counter_hint,
    },
    CategoryRow {
        category: ActionCategory::Duration,
        progress: duration_progress,
        complete: duration_complete,
        hint: duration_hint,
    },
    CategoryRow {
        category: ActionCategory::RangedValue,
        progress: ranged_progress,
        complete: ranged_complete,
        hint: ranged_hint,
    },
    CategoryRow {
        category: ActionCategory::TimingWindow,
        progress: timing_progress,
        complete: timing_complete,
        hint: timing_hint,
    },
    CategoryRow {
        category: ActionCategory::ZoneFill,
        progress: zone_progress,
        complete: zone_complete,
        hint: zone_hint,
    },
];

/// Entry point for catalog lookups.
pub struct ActionCatalog;

impl ActionCatalog {
    pub fn spec(id: ActionId) -> &'static ActionSpec {
        &ACTIONS[id as usize]
    }

    pub fn row(category: ActionCategory) -> &'static CategoryRow {
        &CATEGORY_TABLE[category.index()]
    }

    pub fn action_type(step: &Step) -> ActionType {
        Self::spec(step.action).action_type(&step.params)
    }

    pub fn progress(snapshot: &ActionSnapshot) -> f64 {
        (Self::row(snapshot.spec.category).progress)(snapshot)
    }

    pub fn is_complete(snapshot: &ActionSnapshot) -> bool {
        (Self::row(snapshot.spec.category).complete)(snapshot)
    }

    pub fn hint(snapshot: &ActionSnapshot) -> String {
        (Self::row(snapshot.spec.category).hint)(snapshot)
    }
}

/// `done / target` in [0, 1], reaching 1.0 only once `done >= target`.
fn ratio(done: f64, target: f64) -> f64 {
    if target <= 0.0 || done >= target {
        return 1.0;
    }
    (done / target).clamp(0.0, below_one())
}

fn below_one() -> f64 {
    1.0 - f64::EPSILON
}

// ============================================================================
// Counter
// ============================================================================

fn counter_progress(s: &ActionSnapshot) -> f64 {
    match s.action {
        ActionType::Counter { target } => ratio(f64::from(s.count), f64::from(target)),
        _ => 0.0,
    }
}

fn counter_complete(s: &ActionSnapshot) -> bool {
    match s.action {
        ActionType::Counter { target } => s.count >= target,
        _ => false,
    }
}

fn counter_hint(s: &ActionSnapshot) -> String {
    match s.action {
        ActionType::Counter { target } => {
            format!("{} ({}/{})", s.spec.hint, s.count.min(target), target)
        }
        _ => s.spec.hint.to_string(),
    }
}

// ============================================================================
// Duration
// ============================================================================

fn duration_progress(s: &ActionSnapshot) -> f64 {
    match s.action {
        ActionType::Duration { target_ms } => ratio(s.elapsed_ms as f64, target_ms as f64),
        _ => 0.0,
    }
}

fn duration_complete(s: &ActionSnapshot) -> bool {
    match s.action {
        ActionType::Duration { target_ms } => s.elapsed_ms >= target_ms,
        _ => false,
    }
}

fn duration_hint(s: &ActionSnapshot) -> String {
    let ActionType::Duration { target_ms } = s.action else {
        return s.spec.hint.to_string();
    };
    if s.elapsed_ms == 0 {
        return s.spec.hint.to_string();
    }
    match s.spec.slot {
        Slot::Timer(TimerKind::Wait) => {
            let left = target_ms.saturating_sub(s.elapsed_ms);
            format!("{} ({} left)", s.spec.hint, seconds(left))
        }
        _ => format!(
            "{} ({}%)",
            s.spec.hint,
            (duration_progress(s) * 100.0).floor() as u32
        ),
    }
}

// ============================================================================
// Ranged value
// ============================================================================

fn ranged_progress(s: &ActionSnapshot) -> f64 {
    let (
        ActionType::RangedValue {
            min,
            max,
            target,
            tolerance,
        },
        Some(value),
    ) = (s.action, s.value)
    else {
        return 0.0;
    };
    if !value.is_finite() {
        return 0.0;
    }
    let distance = (value - target).abs();
    if distance <= tolerance {
        return 1.0;
    }
    let range = max - min;
    if range <= 0.0 {
        return 0.0;
    }
    (1.0 - (distance - tolerance) / range).clamp(0.0, below_one())
}

fn ranged_complete(s: &ActionSnapshot) -> bool {
    match (s.action, s.value) {
        (
            ActionType::RangedValue {
                target, tolerance, ..
            },
            Some(value),
        ) => (value - target).abs() <= tolerance,
        _ => false,
    }
}

fn ranged_hint(s: &ActionSnapshot) -> String {
    let ActionType::RangedValue { target, .. } = s.action else {
        return s.spec.hint.to_string();
    };
    match s.value {
        Some(value) => format!(
            "{}: {} now, aim for {}",
            s.spec.hint,
            number(value),
            number(target)
        ),
        None => format!("{}: aim for {}", s.spec.hint, number(target)),
    }
}

// ============================================================================
// Timing window
// ============================================================================

fn timing_progress(s: &ActionSnapshot) -> f64 {
    match s.action {
        ActionType::TimingWindow { total_ms, .. } => ratio(s.elapsed_ms as f64, total_ms as f64),
        _ => 0.0,
    }
}

/// Stop landed inside the perfect sub-window.
pub fn is_perfect_stop(action: &ActionType, elapsed_ms: u64) -> bool {
    match *action {
        ActionType::TimingWindow {
            perfect_start_ms,
            perfect_end_ms,
            ..
        } => (perfect_start_ms..=perfect_end_ms).contains(&elapsed_ms),
        _ => false,
    }
}

fn timing_complete(s: &ActionSnapshot) -> bool {
    match s.action {
        ActionType::TimingWindow {
            total_ms,
            accept_any_stop,
            ..
        } => {
            s.stopped
                && (is_perfect_stop(&s.action, s.elapsed_ms)
                    || (accept_any_stop && s.elapsed_ms <= total_ms))
        }
        _ => false,
    }
}

fn timing_hint(s: &ActionSnapshot) -> String {
    let ActionType::TimingWindow {
        perfect_start_ms,
        perfect_end_ms,
        ..
    } = s.action
    else {
        return s.spec.hint.to_string();
    };
    let window = format!("{} and {}", seconds(perfect_start_ms), seconds(perfect_end_ms));
    if s.elapsed_ms == 0 {
        format!("Press START, then STOP between {}", window)
    } else if s.stopped {
        format!("Stopped at {}. Try again: STOP between {}", seconds(s.elapsed_ms), window)
    } else {
        format!("Press STOP between {} ({} now)", window, seconds(s.elapsed_ms))
    }
}

// ============================================================================
// Zone fill
// ============================================================================

fn zone_progress(s: &ActionSnapshot) -> f64 {
    if s.zone_required == 0 {
        return 1.0;
    }
    let present = s.zone_required.saturating_sub(s.zone_missing.len());
    ratio(present as f64, s.zone_required as f64)
}

fn zone_complete(s: &ActionSnapshot) -> bool {
    s.zone_missing.is_empty()
}

fn zone_hint(s: &ActionSnapshot) -> String {
    if s.zone_missing.is_empty() {
        return format!("Drag an item to the {}", s.zone.display_name());
    }
    format!(
        "Drag the {} to the {}",
        join_labels(&s.zone_missing),
        s.zone.display_name()
    )
}

/// "a", "a and b", "a, b and c".
pub fn join_labels(labels: &[String]) -> String {
    match labels {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn seconds(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

fn number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}
