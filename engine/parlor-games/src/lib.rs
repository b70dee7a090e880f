//! Built-in games for the Parlor game host
//!
//! This crate provides the formats and modes every host ships with, plus the
//! behavior names data files in the catalog directory can bind to.
//!
//! Currently provides:
//! - Guessing (`"guessing"`, inherit-only base of the question games)
//! - Trivia (`"trivia"`, alias `quiz`, variation Reverse Trivia)
//! - Lightning Trivia (`"lightningtrivia"`, inherits Trivia)
//! - Anagrams (`"anagrams"`, free join, private guesses)
//! - Gauntlet (`"gauntlet"`, plays Gauntlet Stage child sessions)
//! - Team and Survival modes
//!
//! # Usage
//!
//! ```rust
//! use parlor_games::builtin_registry;
//!
//! let registry = builtin_registry(&["start", "join"]).expect("built-ins are valid");
//! assert!(registry.resolve("quizteams").is_some());
//! ```

use parlor_core::{
    BehaviorTable, CatalogSource, FormatDescriptor, FormatRegistry, LayerFactory, LoadError,
    PrivateCommands, StaticCatalog, TomlCatalog, VariationDescriptor,
};
use std::path::Path;
use tracing::info;

pub mod anagrams;
pub mod gauntlet;
pub mod guessing;
pub mod lightning;
pub mod modes;
pub mod trivia;

const GUESSING: LayerFactory = LayerFactory::new(guessing::install);
const TRIVIA: LayerFactory = LayerFactory::new(trivia::install);
const LIGHTNING: LayerFactory = LayerFactory::new(lightning::install);
const ANAGRAMS: LayerFactory = LayerFactory::new(anagrams::install);
const GAUNTLET: LayerFactory = LayerFactory::new(gauntlet::game);

/// Formats and modes defined in code.
pub fn builtin_catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_format(
            FormatDescriptor::new("Guessing")
                .inherit_only()
                .with_description("Answer before the clock runs out.")
                .with_install(GUESSING)
                .with_command("guess", "guess")
                .with_command("g", "guess"),
        )
        .with_format(
            FormatDescriptor::new("Trivia")
                .with_inherits("guessing")
                .with_install(TRIVIA)
                .with_description("Answer general knowledge questions. First to 3 points wins.")
                .with_aliases(&["quiz"])
                .with_mode("team")
                .with_mode("survival")
                .with_variation(
                    VariationDescriptor::new("Reverse Trivia", "Reverse")
                        .with_aliases(&["backwards trivia"])
                        .with_variation_aliases(&["rev"])
                        .with_description("Every question is printed back to front.")
                        .with_setting("reverse", "true"),
                ),
        )
        .with_format(
            FormatDescriptor::new("Lightning Trivia")
                .with_inherits("trivia")
                .with_install(LIGHTNING)
                .with_description("Trivia against a short clock.")
                .with_aliases(&["lightning"])
                .with_mode("team")
                .with_setting("round_secs", "8")
                .with_setting("goal", "5"),
        )
        .with_format(
            FormatDescriptor::new("Anagrams")
                .with_inherits("guessing")
                .with_install(ANAGRAMS)
                .with_description("Unscramble the word. No signups, guess from anywhere.")
                .with_free_join(true)
                .with_private_commands(PrivateCommands::Only(vec![
                    "guess".to_string(),
                    "g".to_string(),
                ])),
        )
        .with_format(
            FormatDescriptor::new("Gauntlet")
                .with_game(GAUNTLET)
                .with_description("Three rounds of sudden-death trivia. Most stage wins takes it."),
        )
        .with_format(
            FormatDescriptor::new("Gauntlet Stage")
                .internal()
                .with_inherits("guessing")
                .with_install(TRIVIA)
                .with_setting("goal", "1")
                .with_setting("max_rounds", "5")
                .with_setting("round_secs", "15"),
        )
        .with_mode(modes::team_mode())
        .with_mode(modes::survival_mode())
}

/// Behavior names available to `install`/`game` keys in data files.
pub fn behavior_table() -> BehaviorTable {
    BehaviorTable::new()
        .with("guessing", GUESSING)
        .with("trivia", TRIVIA)
        .with("lightning", LIGHTNING)
        .with("anagrams", ANAGRAMS)
        .with("gauntlet", GAUNTLET)
        .with("team", LayerFactory::new(modes::team))
        .with("survival", LayerFactory::new(modes::survival))
}

/// Registry of the built-in catalog alone.
pub fn builtin_registry(reserved: &[&str]) -> Result<FormatRegistry, LoadError> {
    FormatRegistry::load(&[&builtin_catalog()], reserved)
}

/// Registry of the built-in catalog followed by the data files in
/// `catalog_dir`. A missing directory only means no extra formats.
pub fn load_registry(catalog_dir: &Path, reserved: &[&str]) -> Result<FormatRegistry, LoadError> {
    let builtin = builtin_catalog();
    let data = TomlCatalog::new(catalog_dir, behavior_table());
    let sources: [&dyn CatalogSource; 2] = [&builtin, &data];
    let registry = FormatRegistry::load(&sources, reserved)?;
    info!(
        dir = %catalog_dir.display(),
        formats = registry.len(),
        "Game catalog ready"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests;
