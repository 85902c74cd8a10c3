//! SC-001: Cookbook schema and engine vocabulary.
//!
//! Defines the YAML schema types for cookbooks, recipes, steps and action
//! parameters, plus the closed vocabularies the engine reasons about (zones,
//! action identifiers, categories, gestures, step states). Content types
//! derive Serialize/Deserialize for YAML roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Item and tool identifiers are plain content-defined strings.
pub type ItemId = String;

// ============================================================================
// Top-level souschef.yaml
// ============================================================================

/// Root document: engine tuning plus the recipes it can run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookbook {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable cookbook name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Engine timing and scoring
    #[serde(default)]
    pub engine: EngineConfig,

    /// Display names for item and tool ids
    #[serde(default)]
    pub items: IndexMap<ItemId, String>,

    /// Recipes keyed by id (order-preserving)
    pub recipes: IndexMap<String, Recipe>,
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Timing and scoring knobs for a [`StepEngine`](super::engine::StepEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between continuous-action ticks
    pub tick_interval_ms: u64,

    /// StepDone to next step when the step has no speech practice
    pub step_done_delay_ms: u64,

    /// StepDone to SpeakingCheck when the step has a phrase
    pub speaking_prompt_delay_ms: u64,

    /// Correct speech result to next step
    pub speaking_advance_delay_ms: u64,

    /// Global switch for speech practice
    pub speech_practice: bool,

    /// Score increments
    pub scoring: Scoring,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            step_done_delay_ms: 2000,
            speaking_prompt_delay_ms: 1500,
            speaking_advance_delay_ms: 1500,
            speech_practice: true,
            scoring: Scoring::default(),
        }
    }
}

/// Score awarded per event. Score never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoring {
    pub step_bonus: u32,
    pub speaking_bonus: u32,
    pub perfect_timing_bonus: u32,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            step_bonus: 20,
            speaking_bonus: 10,
            perfect_timing_bonus: 20,
        }
    }
}

// ============================================================================
// Recipes
// ============================================================================

/// An ordered sequence of steps. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// English display name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub difficulty: Difficulty,

    /// Item display names local to this recipe (merged with the cookbook's)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<ItemId, String>,

    pub steps: Vec<Step>,
}

impl Recipe {
    /// Display name for an item or tool, falling back to the humanized id.
    pub fn label(&self, id: &str) -> String {
        match self.labels.get(id) {
            Some(name) => name.clone(),
            None => id.replace('_', " "),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

/// One step of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Chef line spoken on step entry
    pub instruction: String,

    /// Gesture-driven action that completes the step
    pub action: ActionId,

    /// Zone the step's items must be dropped into
    pub zone: Zone,

    /// Required item ids (set semantics, order irrelevant)
    #[serde(default)]
    pub items: Vec<ItemId>,

    /// Optional required tool id
    #[serde(default)]
    pub tool: Option<ItemId>,

    #[serde(default)]
    pub params: ActionParams,

    /// Shown when the step completes
    #[serde(default = "default_success")]
    pub success: String,

    /// Speech-practice phrase; absent means no SpeakingCheck
    #[serde(default)]
    pub phrase: Option<String>,
}

fn default_success() -> String {
    "Great job!".to_string()
}

impl Step {
    /// True when the step names at least one item or a tool.
    pub fn has_requirements(&self) -> bool {
        !self.items.is_empty() || self.tool.is_some()
    }

    /// Drop validation: right zone, and a required item, the tool, or no requirements.
    pub fn accepts_drop(&self, item: &str, zone: Zone) -> bool {
        if zone != self.zone {
            return false;
        }
        !self.has_requirements()
            || self.items.iter().any(|i| i == item)
            || self.tool.as_deref() == Some(item)
    }

    /// The speech-practice phrase, if it is non-blank.
    pub fn speaking_phrase(&self) -> Option<&str> {
        self.phrase.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

// ============================================================================
// Action parameters
// ============================================================================

/// Per-step numeric configuration. Each action reads the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionParams {
    pub tap_count: u32,
    pub swipe_count: u32,
    pub shake_count: u32,
    pub circle_count: u32,
    pub knead_repeats: u32,
    pub flip_count: u32,
    pub snap_point_count: u32,
    pub hold_ms: u64,
    pub pour_time_ms: u64,
    pub cook_time_ms: u64,
    pub warm_up_ms: u64,
    pub rotary: RotaryParams,
    pub slider: SliderParams,
    pub timing: TimingParams,
}

impl Default for ActionParams {
    fn default() -> Self {
        Self {
            tap_count: 5,
            swipe_count: 6,
            shake_count: 4,
            circle_count: 8,
            knead_repeats: 6,
            flip_count: 2,
            snap_point_count: 3,
            hold_ms: 1500,
            pour_time_ms: 1000,
            cook_time_ms: 3000,
            warm_up_ms: 2000,
            rotary: RotaryParams::default(),
            slider: SliderParams::default(),
            timing: TimingParams::default(),
        }
    }
}

/// Knob range (temperature, timer dial).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotaryParams {
    pub min: f64,
    pub max: f64,
    pub target: f64,
    pub tolerance: f64,
}

impl Default for RotaryParams {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 250.0,
            target: 180.0,
            tolerance: 10.0,
        }
    }
}

/// Slider range (oil level, heat level), normalized to 0..1 by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderParams {
    pub min: f64,
    pub max: f64,
    pub target: f64,
    pub tolerance: f64,
}

impl Default for SliderParams {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            target: 0.7,
            tolerance: 0.1,
        }
    }
}

/// Start/stop timing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingParams {
    pub total_ms: u64,
    pub perfect_start_ms: u64,
    pub perfect_end_ms: u64,
    /// Any stop before `total_ms` completes the step (bonus still needs the window)
    pub accept_any_stop: bool,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            total_ms: 5000,
            perfect_start_ms: 3500,
            perfect_end_ms: 4500,
            accept_any_stop: true,
        }
    }
}

// ============================================================================
// Resolved action types
// ============================================================================

/// An action's completion rule with its parameters resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionType {
    Counter {
        target: u32,
    },
    Duration {
        target_ms: u64,
    },
    RangedValue {
        min: f64,
        max: f64,
        target: f64,
        tolerance: f64,
    },
    TimingWindow {
        total_ms: u64,
        perfect_start_ms: u64,
        perfect_end_ms: u64,
        accept_any_stop: bool,
    },
    ZoneFill,
}

impl ActionType {
    pub fn category(&self) -> ActionCategory {
        match self {
            Self::Counter { .. } => ActionCategory::Counter,
            Self::Duration { .. } => ActionCategory::Duration,
            Self::RangedValue { .. } => ActionCategory::RangedValue,
            Self::TimingWindow { .. } => ActionCategory::TimingWindow,
            Self::ZoneFill => ActionCategory::ZoneFill,
        }
    }
}

/// Completion formula family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Counter,
    Duration,
    RangedValue,
    TimingWindow,
    ZoneFill,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 5] = [
        Self::Counter,
        Self::Duration,
        Self::RangedValue,
        Self::TimingWindow,
        Self::ZoneFill,
    ];

    /// Row index into the category table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Categories that start a step directly in ReadyAction.
    pub fn initial_state(self) -> StepState {
        match self {
            Self::ZoneFill => StepState::WaitingItem,
            _ => StepState::ReadyAction,
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Duration => write!(f, "duration"),
            Self::RangedValue => write!(f, "ranged_value"),
            Self::TimingWindow => write!(f, "timing_window"),
            Self::ZoneFill => write!(f, "zone_fill"),
        }
    }
}

// ============================================================================
// Action identifiers
// ============================================================================

/// Every action a step can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    DragToZone,
    Serve,
    TapToCut,
    TapToPound,
    VentSteamTap,
    TapToCrack,
    TapToDrizzle,
    SwipeToStir,
    WipeFogSwipe,
    SkimFoamSwipe,
    ShakePan,
    ShakeBasket,
    SeasonShake,
    WhiskCircles,
    KneadDrag,
    GrillFlipSwipe,
    GarnishDragSnap,
    Pour,
    OvenPreheatHold,
    GrillOnHold,
    SteamStart,
    WaitCook,
    WaitOilHeat,
    WaitBoil,
    WaitSear,
    RotateKnobTemp,
    RotateKnobTimer,
    OilLevelSlider,
    HeatLevelSlider,
    TimingStop,
}

impl ActionId {
    pub const ALL: [ActionId; 30] = [
        Self::DragToZone,
        Self::Serve,
        Self::TapToCut,
        Self::TapToPound,
        Self::VentSteamTap,
        Self::TapToCrack,
        Self::TapToDrizzle,
        Self::SwipeToStir,
        Self::WipeFogSwipe,
        Self::SkimFoamSwipe,
        Self::ShakePan,
        Self::ShakeBasket,
        Self::SeasonShake,
        Self::WhiskCircles,
        Self::KneadDrag,
        Self::GrillFlipSwipe,
        Self::GarnishDragSnap,
        Self::Pour,
        Self::OvenPreheatHold,
        Self::GrillOnHold,
        Self::SteamStart,
        Self::WaitCook,
        Self::WaitOilHeat,
        Self::WaitBoil,
        Self::WaitSear,
        Self::RotateKnobTemp,
        Self::RotateKnobTimer,
        Self::OilLevelSlider,
        Self::HeatLevelSlider,
        Self::TimingStop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DragToZone => "drag_to_zone",
            Self::Serve => "serve",
            Self::TapToCut => "tap_to_cut",
            Self::TapToPound => "tap_to_pound",
            Self::VentSteamTap => "vent_steam_tap",
            Self::TapToCrack => "tap_to_crack",
            Self::TapToDrizzle => "tap_to_drizzle",
            Self::SwipeToStir => "swipe_to_stir",
            Self::WipeFogSwipe => "wipe_fog_swipe",
            Self::SkimFoamSwipe => "skim_foam_swipe",
            Self::ShakePan => "shake_pan",
            Self::ShakeBasket => "shake_basket",
            Self::SeasonShake => "season_shake",
            Self::WhiskCircles => "whisk_circles",
            Self::KneadDrag => "knead_drag",
            Self::GrillFlipSwipe => "grill_flip_swipe",
            Self::GarnishDragSnap => "garnish_drag_snap",
            Self::Pour => "pour",
            Self::OvenPreheatHold => "oven_preheat_hold",
            Self::GrillOnHold => "grill_on_hold",
            Self::SteamStart => "steam_start",
            Self::WaitCook => "wait_cook",
            Self::WaitOilHeat => "wait_oil_heat",
            Self::WaitBoil => "wait_boil",
            Self::WaitSear => "wait_sear",
            Self::RotateKnobTemp => "rotate_knob_temp",
            Self::RotateKnobTimer => "rotate_knob_timer",
            Self::OilLevelSlider => "oil_level_slider",
            Self::HeatLevelSlider => "heat_level_slider",
            Self::TimingStop => "timing_stop",
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete gesture reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    Tap,
    Swipe,
    Shake,
    Circle,
    Knead,
    Flip,
    Snap,
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tap => write!(f, "tap"),
            Self::Swipe => write!(f, "swipe"),
            Self::Shake => write!(f, "shake"),
            Self::Circle => write!(f, "circle"),
            Self::Knead => write!(f, "knead"),
            Self::Flip => write!(f, "flip"),
            Self::Snap => write!(f, "snap"),
        }
    }
}

/// Counter slot an action increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Tap,
    Stir,
    Shake,
    Circle,
    Knead,
    Flip,
    Snap,
}

/// Stopwatch slot an action measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Hold,
    Wait,
    Timing,
}

/// Continuous value slot an action reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Rotary,
    Slider,
}

/// Which session slot drives an action's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Counter(CounterKind),
    Timer(TimerKind),
    Value(ValueKind),
    Zone,
}

// ============================================================================
// Zones
// ============================================================================

/// Named location that can hold items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Fridge,
    Counter,
    CuttingBoard,
    Pan,
    Pot,
    Plate,
    ToolRack,
    Oven,
    Steamer,
    Grill,
    Fryer,
    DrainRack,
    Garnish,
    MixingBowl,
}

impl Zone {
    pub const ALL: [Zone; 14] = [
        Self::Fridge,
        Self::Counter,
        Self::CuttingBoard,
        Self::Pan,
        Self::Pot,
        Self::Plate,
        Self::ToolRack,
        Self::Oven,
        Self::Steamer,
        Self::Grill,
        Self::Fryer,
        Self::DrainRack,
        Self::Garnish,
        Self::MixingBowl,
    ];

    /// Human-readable name used in hints.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fridge => "Fridge",
            Self::Counter => "Counter",
            Self::CuttingBoard => "Cutting Board",
            Self::Pan => "Pan",
            Self::Pot => "Pot",
            Self::Plate => "Plate",
            Self::ToolRack => "Tool Rack",
            Self::Oven => "Oven",
            Self::Steamer => "Steamer",
            Self::Grill => "Grill",
            Self::Fryer => "Fryer",
            Self::DrainRack => "Drain Rack",
            Self::Garnish => "Garnish Station",
            Self::MixingBowl => "Mixing Bowl",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fridge => write!(f, "fridge"),
            Self::Counter => write!(f, "counter"),
            Self::CuttingBoard => write!(f, "cutting_board"),
            Self::Pan => write!(f, "pan"),
            Self::Pot => write!(f, "pot"),
            Self::Plate => write!(f, "plate"),
            Self::ToolRack => write!(f, "tool_rack"),
            Self::Oven => write!(f, "oven"),
            Self::Steamer => write!(f, "steamer"),
            Self::Grill => write!(f, "grill"),
            Self::Fryer => write!(f, "fryer"),
            Self::DrainRack => write!(f, "drain_rack"),
            Self::Garnish => write!(f, "garnish"),
            Self::MixingBowl => write!(f, "mixing_bowl"),
        }
    }
}

// ============================================================================
// Step state
// ============================================================================

/// Per-step state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    WaitingItem,
    ReadyAction,
    ActionInProgress,
    StepDone,
    SpeakingCheck,
    RecipeDone,
}

impl StepState {
    /// States in which an action's own inputs are meaningful.
    pub fn accepts_action_input(self) -> bool {
        matches!(self, Self::ReadyAction | Self::ActionInProgress)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingItem => write!(f, "WAITING_ITEM"),
            Self::ReadyAction => write!(f, "READY_ACTION"),
            Self::ActionInProgress => write!(f, "ACTION_IN_PROGRESS"),
            Self::StepDone => write!(f, "STEP_DONE"),
            Self::SpeakingCheck => write!(f, "SPEAKING_CHECK"),
            Self::RecipeDone => write!(f, "RECIPE_DONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sc001_step_yaml_defaults() {
        let yaml = r#"
instruction: "Cut the carrot."
action: tap_to_cut
zone: cutting_board
items: [carrot]
tool: knife
"#;
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(step.action, ActionId::TapToCut);
        assert_eq!(step.zone, Zone::CuttingBoard);
        assert_eq!(step.params, ActionParams::default());
        assert_eq!(step.success, "Great job!");
        assert!(step.phrase.is_none());
    }

    #[test]
    fn test_sc001_partial_slider_keeps_slider_defaults() {
        let yaml = r#"
slider:
  target: 0.4
"#;
        let params: ActionParams = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(params.slider.target, 0.4);
        assert_eq!(params.slider.max, 1.0);
        assert_eq!(params.slider.tolerance, 0.1);
        assert_eq!(params.rotary.max, 250.0);
    }

    #[test]
    fn test_sc001_accepts_drop() {
        let step = Step {
            instruction: "Put the onion on the board.".to_string(),
            action: ActionId::TapToCut,
            zone: Zone::CuttingBoard,
            items: vec!["onion".to_string()],
            tool: Some("knife".to_string()),
            params: ActionParams::default(),
            success: "Nice".to_string(),
            phrase: None,
        };
        assert!(step.accepts_drop("onion", Zone::CuttingBoard));
        assert!(step.accepts_drop("knife", Zone::CuttingBoard));
        assert!(!step.accepts_drop("onion", Zone::Pot));
        assert!(!step.accepts_drop("garlic", Zone::CuttingBoard));
    }

    #[test]
    fn test_sc001_no_requirements_accepts_anything_in_zone() {
        let step: Step = serde_yaml_ng::from_str(
            "instruction: Serve it\naction: serve\nzone: plate\n",
        )
        .unwrap();
        assert!(step.accepts_drop("soup", Zone::Plate));
        assert!(!step.accepts_drop("soup", Zone::Pot));
    }

    #[test]
    fn test_sc001_blank_phrase_is_no_phrase() {
        let mut step: Step = serde_yaml_ng::from_str(
            "instruction: Stir\naction: swipe_to_stir\nzone: pot\nphrase: \"  \"\n",
        )
        .unwrap();
        assert!(step.speaking_phrase().is_none());
        step.phrase = Some(" stir ".to_string());
        assert_eq!(step.speaking_phrase(), Some("stir"));
    }

    #[test]
    fn test_sc001_action_id_serde_matches_display() {
        for id in ActionId::ALL {
            let yaml = serde_yaml_ng::to_string(&id).unwrap();
            assert_eq!(yaml.trim(), id.to_string());
        }
    }

    #[test]
    fn test_sc001_zone_serde_matches_display() {
        for zone in Zone::ALL {
            let yaml = serde_yaml_ng::to_string(&zone).unwrap();
            assert_eq!(yaml.trim(), zone.to_string());
        }
    }

    #[test]
    fn test_sc001_initial_state_per_category() {
        assert_eq!(
            ActionCategory::ZoneFill.initial_state(),
            StepState::WaitingItem
        );
        for cat in [
            ActionCategory::Counter,
            ActionCategory::Duration,
            ActionCategory::RangedValue,
            ActionCategory::TimingWindow,
        ] {
            assert_eq!(cat.initial_state(), StepState::ReadyAction);
        }
    }

    #[test]
    fn test_sc001_category_index_is_table_order() {
        for (i, cat) in ActionCategory::ALL.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
    }

    #[test]
    fn test_sc001_recipe_label_fallback() {
        let mut recipe = Recipe {
            name: "Soup".to_string(),
            description: None,
            difficulty: Difficulty::Easy,
            labels: IndexMap::new(),
            steps: vec![],
        };
        assert_eq!(recipe.label("cutting_knife"), "cutting knife");
        recipe
            .labels
            .insert("cutting_knife".to_string(), "Chef's Knife".to_string());
        assert_eq!(recipe.label("cutting_knife"), "Chef's Knife");
    }

    #[test]
    fn test_sc001_step_state_display() {
        assert_eq!(StepState::ActionInProgress.to_string(), "ACTION_IN_PROGRESS");
        assert_eq!(StepState::RecipeDone.to_string(), "RECIPE_DONE");
    }
}
