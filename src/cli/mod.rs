//! SC-010: CLI subcommands (init, validate, list, show, simulate, completions).

use crate::core::catalog::ActionCatalog;
use crate::core::cookbook::{self, RecipeBook, RecipeSource};
use crate::core::error::CookbookError;
use crate::core::events::{Notification, Stamped};
use crate::core::script::{self, SimulationReport};
use crate::core::types::{Cookbook, Recipe};
use crate::journal::transcript;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const STARTER_COOKBOOK: &str = include_str!("../../cookbooks/starter.yaml");

#[derive(Parser, Debug)]
#[command(
    name = "souschef",
    version,
    about = "Gesture-driven cooking tutorials: validate cookbooks and simulate recipe runs"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter souschef.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a cookbook
    Validate {
        /// Path to souschef.yaml
        #[arg(short, long, default_value = "souschef.yaml")]
        file: PathBuf,
    },

    /// List the recipes in a cookbook
    List {
        /// Path to souschef.yaml
        #[arg(short, long, default_value = "souschef.yaml")]
        file: PathBuf,
    },

    /// Show the steps of one recipe
    Show {
        /// Path to souschef.yaml
        #[arg(short, long, default_value = "souschef.yaml")]
        file: PathBuf,

        /// Recipe id
        #[arg(short, long)]
        recipe: String,
    },

    /// Run a recipe against scripted input on a simulated clock
    Simulate {
        /// Path to souschef.yaml
        #[arg(short, long, default_value = "souschef.yaml")]
        file: PathBuf,

        /// Recipe id
        #[arg(short, long)]
        recipe: String,

        /// Input script (default: an ideal run)
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Append every notification to this JSONL file
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Simulated time to keep ticking after the last input
        #[arg(long, default_value_t = 5000)]
        settle_ms: u64,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::List { file } => cmd_list(&file),
        Commands::Show { file, recipe } => cmd_show(&file, &recipe),
        Commands::Simulate {
            file,
            recipe,
            script,
            transcript,
            settle_ms,
        } => cmd_simulate(
            &file,
            &recipe,
            script.as_deref(),
            transcript.as_deref(),
            settle_ms,
        ),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("souschef.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&config_path, STARTER_COOKBOOK)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized souschef cookbook at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let book = load(file)?;
    let steps: usize = book.recipes.values().map(|r| r.steps.len()).sum();
    println!(
        "OK: {} ({} recipes, {} steps)",
        book.name,
        book.recipes.len(),
        steps
    );
    Ok(())
}

/// Parse and validate a cookbook, printing every validation error.
fn load(file: &Path) -> Result<Cookbook, String> {
    match cookbook::load_cookbook(file) {
        Ok(book) => Ok(book),
        Err(CookbookError::Invalid(errors)) => {
            for e in &errors {
                eprintln!("  ERROR: {}", e);
            }
            Err(format!("{} validation error(s)", errors.len()))
        }
        Err(e) => Err(e.to_string()),
    }
}

fn cmd_list(file: &Path) -> Result<(), String> {
    let book = load(file)?;
    println!("{}: {} recipes", book.name, book.recipes.len());
    for (id, recipe) in &book.recipes {
        println!(
            "  {:<20} {:<28} {:>2} steps  {}",
            id,
            recipe.name,
            recipe.steps.len(),
            recipe.difficulty
        );
    }
    Ok(())
}

fn cmd_show(file: &Path, recipe_id: &str) -> Result<(), String> {
    let book = load(file)?;
    let source = RecipeBook::from_cookbook(&book);
    let recipe = source
        .recipe(recipe_id)
        .ok_or_else(|| format!("recipe not found: {}", recipe_id))?;
    print_recipe(recipe_id, &recipe);
    println!();
    println!(
        "Perfect score: {}",
        script::perfect_score(&recipe, &book.engine)
    );
    Ok(())
}

fn print_recipe(id: &str, recipe: &Recipe) {
    println!("{} ({}) - {}", recipe.name, id, recipe.difficulty);
    if let Some(desc) = &recipe.description {
        println!("  {}", desc);
    }
    println!();
    for (i, step) in recipe.steps.iter().enumerate() {
        let category = ActionCatalog::spec(step.action).category;
        println!(
            "  {:>2}. [{} @ {}] {}",
            i + 1,
            step.action,
            step.zone,
            step.instruction
        );
        let mut needs: Vec<String> = step.items.iter().map(|id| recipe.label(id)).collect();
        if let Some(tool) = &step.tool {
            needs.push(format!("{} (tool)", recipe.label(tool)));
        }
        if !needs.is_empty() {
            println!("      needs: {}", needs.join(", "));
        }
        println!("      {}", category);
        if let Some(phrase) = step.speaking_phrase() {
            println!("      say: \"{}\"", phrase);
        }
    }
}

fn cmd_simulate(
    file: &Path,
    recipe_id: &str,
    script_path: Option<&Path>,
    transcript_path: Option<&Path>,
    settle_ms: u64,
) -> Result<(), String> {
    let book = load(file)?;
    let source = RecipeBook::from_cookbook(&book);
    let recipe = source
        .recipe(recipe_id)
        .ok_or_else(|| format!("recipe not found: {}", recipe_id))?;

    let events = match script_path {
        Some(path) => script::load_script(path).map_err(|e| e.to_string())?,
        None => script::perfect_run(&recipe, &book.engine),
    };

    println!(
        "Simulating: {} ({}), {} steps, {} inputs",
        recipe.name,
        recipe_id,
        recipe.steps.len(),
        events.len()
    );
    let report = script::simulate(
        Arc::new(source),
        &book.engine,
        recipe_id,
        &events,
        settle_ms,
    )
    .map_err(|e| e.to_string())?;
    print_report(&report);

    if let Some(path) = transcript_path {
        let written = transcript::append_transcript(path, &report.notifications)
            .map_err(|e| e.to_string())?;
        println!("Transcript: {} ({} events)", path.display(), written);
    }

    if report.finished() {
        Ok(())
    } else {
        Err(format!(
            "recipe stopped in {} after {} of {} steps",
            report.final_state, report.steps_completed, report.total_steps
        ))
    }
}

fn print_report(report: &SimulationReport) {
    for entry in &report.notifications {
        if let Some(line) = describe(entry) {
            println!("  [{:>7.1}s] {}", entry.at_ms as f64 / 1000.0, line);
        }
    }
    println!();
    let counts: Vec<String> = transcript::summarize(&report.notifications)
        .iter()
        .map(|(name, n)| format!("{} {}", name, n))
        .collect();
    println!("Events: {}", counts.join(", "));
    println!(
        "Result: {}, score {} ({}/{} steps) in {:.1}s",
        report.final_state,
        report.score,
        report.steps_completed,
        report.total_steps,
        report.ended_at_ms as f64 / 1000.0
    );
}

/// One-line rendering of the notifications worth showing on a terminal.
fn describe(entry: &Stamped) -> Option<String> {
    match &entry.notification {
        Notification::StepChanged { index, total, step } => Some(format!(
            "step {}/{} {}: {}",
            index + 1,
            total,
            step.action,
            step.instruction
        )),
        Notification::ActionComplete { action } => Some(format!("{} complete", action)),
        Notification::TimingResult {
            elapsed_ms,
            perfect,
        } => Some(format!(
            "stopped at {:.1}s{}",
            *elapsed_ms as f64 / 1000.0,
            if *perfect { " (perfect)" } else { "" }
        )),
        Notification::SpeakingRequired { phrase } => Some(format!("say \"{}\"", phrase)),
        Notification::SpeakingResult { correct, .. } => Some(
            if *correct { "speech correct" } else { "speech incorrect" }.to_string(),
        ),
        Notification::Hint { text } => Some(format!("hint: {}", text)),
        Notification::Error { message } => Some(format!("error: {}", message)),
        Notification::RecipeComplete { score } => Some(format!("recipe complete, score {}", score)),
        _ => None,
    }
}

fn cmd_completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "souschef", &mut std::io::stdout());
}
