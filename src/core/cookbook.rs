//! SC-002: Cookbook parsing, validation and the in-memory recipe source.
//!
//! Parses souschef.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - At least one recipe, each with at least one step
//! - Ranged and timing parameters of the action a step uses are coherent
//! - Item and tool ids are declared when an `items` table is present

use super::catalog::ActionCatalog;
use super::error::CookbookError;
use super::types::*;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a souschef.yaml file from disk.
pub fn parse_cookbook_file(path: &Path) -> Result<Cookbook, CookbookError> {
    let content = std::fs::read_to_string(path).map_err(|source| CookbookError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_cookbook(&content)
}

/// Parse a souschef.yaml from a string.
pub fn parse_cookbook(yaml: &str) -> Result<Cookbook, CookbookError> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Parse and validate in one go.
pub fn load_cookbook(path: &Path) -> Result<Cookbook, CookbookError> {
    let cookbook = parse_cookbook_file(path)?;
    let errors = validate_cookbook(&cookbook);
    if errors.is_empty() {
        Ok(cookbook)
    } else {
        Err(CookbookError::Invalid(errors))
    }
}

/// Validate a parsed cookbook. Returns a list of errors (empty = valid).
pub fn validate_cookbook(book: &Cookbook) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if book.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", book.version),
        });
    }

    if book.name.is_empty() {
        errors.push(ValidationError {
            message: "name must not be empty".to_string(),
        });
    }

    if book.recipes.is_empty() {
        errors.push(ValidationError {
            message: "cookbook has no recipes".to_string(),
        });
    }

    if book.engine.tick_interval_ms == 0 {
        errors.push(ValidationError {
            message: "engine.tick_interval_ms must be greater than 0".to_string(),
        });
    }

    for (id, recipe) in &book.recipes {
        if recipe.name.is_empty() {
            errors.push(ValidationError {
                message: format!("recipe '{}' has no name", id),
            });
        }
        if recipe.steps.is_empty() {
            errors.push(ValidationError {
                message: format!("recipe '{}' has no steps", id),
            });
        }
        for (i, step) in recipe.steps.iter().enumerate() {
            validate_step(book, id, recipe, i + 1, step, &mut errors);
        }
    }

    errors
}

fn validate_step(
    book: &Cookbook,
    recipe_id: &str,
    recipe: &Recipe,
    number: usize,
    step: &Step,
    errors: &mut Vec<ValidationError>,
) {
    let at = format!("recipe '{}' step {}", recipe_id, number);

    for (i, item) in step.items.iter().enumerate() {
        if step.items[..i].contains(item) {
            errors.push(ValidationError {
                message: format!("{} lists item '{}' twice", at, item),
            });
        }
    }

    if !book.items.is_empty() {
        for id in step.items.iter().chain(step.tool.iter()) {
            if !book.items.contains_key(id) && !recipe.labels.contains_key(id) {
                errors.push(ValidationError {
                    message: format!("{} references unknown item '{}'", at, id),
                });
            }
        }
    }

    match ActionCatalog::action_type(step) {
        ActionType::RangedValue {
            min,
            max,
            target,
            tolerance,
        } => {
            if !(min.is_finite() && max.is_finite() && target.is_finite() && tolerance.is_finite())
            {
                errors.push(ValidationError {
                    message: format!("{} ({}) has a non-finite range", at, step.action),
                });
            } else {
                if min >= max {
                    errors.push(ValidationError {
                        message: format!("{} ({}) needs min < max", at, step.action),
                    });
                }
                if target < min || target > max {
                    errors.push(ValidationError {
                        message: format!(
                            "{} ({}) target {} is outside [{}, {}]",
                            at, step.action, target, min, max
                        ),
                    });
                }
                if tolerance < 0.0 {
                    errors.push(ValidationError {
                        message: format!("{} ({}) has a negative tolerance", at, step.action),
                    });
                }
            }
        }
        ActionType::TimingWindow {
            total_ms,
            perfect_start_ms,
            perfect_end_ms,
            ..
        } => {
            if perfect_start_ms > perfect_end_ms || perfect_end_ms > total_ms {
                errors.push(ValidationError {
                    message: format!(
                        "{} ({}) needs perfect_start_ms <= perfect_end_ms <= total_ms",
                        at, step.action
                    ),
                });
            }
        }
        ActionType::Counter { .. } | ActionType::Duration { .. } | ActionType::ZoneFill => {}
    }
}

// ============================================================================
// Recipe source
// ============================================================================

/// Read-only content repository the engine pulls recipes from.
pub trait RecipeSource {
    fn recipe(&self, id: &str) -> Option<Arc<Recipe>>;
}

/// In-memory recipe source, usually built from a [`Cookbook`].
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: IndexMap<String, Arc<Recipe>>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every recipe out of `book`, merging the cookbook-wide item names
    /// under each recipe's own labels.
    pub fn from_cookbook(book: &Cookbook) -> Self {
        let mut out = Self::new();
        for (id, recipe) in &book.recipes {
            let mut recipe = recipe.clone();
            for (item, name) in &book.items {
                recipe
                    .labels
                    .entry(item.clone())
                    .or_insert_with(|| name.clone());
            }
            out.insert(id, recipe);
        }
        out
    }

    pub fn insert(&mut self, id: &str, recipe: Recipe) {
        self.recipes.insert(id.to_string(), Arc::new(recipe));
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl RecipeSource for RecipeBook {
    fn recipe(&self, id: &str) -> Option<Arc<Recipe>> {
        self.recipes.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
version: "1.0"
name: test-kitchen
items:
  carrot: Carrot
  knife: Knife
recipes:
  soup:
    name: Soup
    steps:
      - instruction: Put the carrot on the board.
        action: drag_to_zone
        zone: cutting_board
        items: [carrot]
        tool: knife
      - instruction: Turn up the heat.
        action: rotate_knob_temp
        zone: pot
        params:
          rotary: { target: 200 }
"#;

    #[test]
    fn test_sc002_parse_valid() {
        let book = parse_cookbook(VALID).unwrap();
        assert_eq!(book.name, "test-kitchen");
        assert_eq!(book.recipes.len(), 1);
        assert_eq!(book.engine, EngineConfig::default());
        let errors = validate_cookbook(&book);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_sc002_bad_version_and_name() {
        let book = parse_cookbook(
            r#"
version: "2.0"
name: ""
recipes: {}
"#,
        )
        .unwrap();
        let errors = validate_cookbook(&book);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].message.contains("version"));
    }

    #[test]
    fn test_sc002_empty_recipe() {
        let book = parse_cookbook(
            r#"
version: "1.0"
name: k
recipes:
  nothing:
    name: Nothing
    steps: []
"#,
        )
        .unwrap();
        let errors = validate_cookbook(&book);
        assert!(errors.iter().any(|e| e.message.contains("has no steps")));
    }

    #[test]
    fn test_sc002_unknown_item() {
        let yaml = VALID.replace("tool: knife", "tool: spoon");
        let book = parse_cookbook(&yaml).unwrap();
        let errors = validate_cookbook(&book);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unknown item 'spoon'"));
    }

    #[test]
    fn test_sc002_target_out_of_range() {
        let yaml = VALID.replace("target: 200", "target: 400");
        let errors = validate_cookbook(&parse_cookbook(&yaml).unwrap());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("outside"));
    }

    #[test]
    fn test_sc002_bad_timing_window() {
        let book = parse_cookbook(
            r#"
version: "1.0"
name: k
recipes:
  egg:
    name: Egg
    steps:
      - instruction: Stop the timer.
        action: timing_stop
        zone: pan
        params:
          timing: { total_ms: 1000, perfect_start_ms: 900, perfect_end_ms: 1200 }
"#,
        )
        .unwrap();
        let errors = validate_cookbook(&book);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("perfect_start_ms"));
    }

    #[test]
    fn test_sc002_duplicate_item() {
        let yaml = VALID.replace("items: [carrot]", "items: [carrot, carrot]");
        let errors = validate_cookbook(&parse_cookbook(&yaml).unwrap());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("twice"));
    }

    #[test]
    fn test_sc002_parse_error() {
        let result = parse_cookbook("version: [unclosed");
        assert!(matches!(result, Err(CookbookError::Parse(_))));
    }

    #[test]
    fn test_sc002_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_cookbook(&dir.path().join("nope.yaml"));
        match result {
            Err(CookbookError::Io { path, .. }) => assert!(path.ends_with("nope.yaml")),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_sc002_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("souschef.yaml");
        std::fs::write(&path, VALID.replace("\"1.0\"", "\"0.9\"")).unwrap();
        match load_cookbook(&path) {
            Err(CookbookError::Invalid(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_sc002_recipe_book_merges_labels() {
        let book = parse_cookbook(VALID).unwrap();
        let source = RecipeBook::from_cookbook(&book);
        assert_eq!(source.len(), 1);
        assert_eq!(source.ids().collect::<Vec<_>>(), vec!["soup"]);
        let soup = source.recipe("soup").unwrap();
        assert_eq!(soup.label("knife"), "Knife");
        assert!(source.recipe("pie").is_none());
    }
}
