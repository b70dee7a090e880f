//! Format, variation and mode descriptors
//!
//! Descriptors are plain data plus the layer factories that give a format its
//! behavior. They are built by catalog sources, normalized once by the
//! registry, and cloned (never mutated) by the resolver.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::id::to_id;
use crate::layer::LayerFactory;

/// Where a mode's name goes when building a format's display id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeNaming {
    /// `"Survival" + "Trivia"` -> `survivaltrivia`
    Prefix,
    /// `"Trivia" + "Team"` -> `triviateam`
    #[default]
    Suffix,
}

impl ModeNaming {
    /// Combine a mode name (or alias) with a format name (or alias) into an id.
    pub fn compose(self, mode: &str, format: &str) -> String {
        match self {
            ModeNaming::Prefix => to_id(&format!("{mode}{format}")),
            ModeNaming::Suffix => to_id(&format!("{format}{mode}")),
        }
    }
}

/// Which commands a session accepts from direct-message contexts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivateCommands {
    #[default]
    None,
    All,
    Only(Vec<String>),
}

impl PrivateCommands {
    pub fn allows(&self, command: &str) -> bool {
        match self {
            PrivateCommands::None => false,
            PrivateCommands::All => true,
            PrivateCommands::Only(commands) => {
                let command = to_id(command);
                commands.iter().any(|c| to_id(c) == command)
            }
        }
    }
}

/// A named partial override of a format.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationDescriptor {
    /// Display name, e.g. "Reverse Trivia"
    pub name: String,
    /// Derived from `name` by the registry
    pub id: String,
    /// Selector key, e.g. "Reverse"; normalized it becomes the variation id
    pub variation: String,
    /// Full aliases, each a composite alias for `format,variation`
    pub aliases: Vec<String>,
    /// Short selector aliases, e.g. "rev" for "reverse"
    pub variation_aliases: Vec<String>,
    pub description: Option<String>,
    pub free_join: Option<bool>,
    pub settings: BTreeMap<String, String>,
}

impl VariationDescriptor {
    pub fn new(name: impl Into<String>, variation: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: to_id(&name),
            name,
            variation: variation.into(),
            aliases: Vec::new(),
            variation_aliases: Vec::new(),
            description: None,
            free_join: None,
            settings: BTreeMap::new(),
        }
    }

    /// Normalized selector key
    pub fn key(&self) -> String {
        to_id(&self.variation)
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_variation_aliases(mut self, aliases: &[&str]) -> Self {
        self.variation_aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_free_join(mut self, free_join: bool) -> Self {
        self.free_join = Some(free_join);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// A cross-cutting behavior attachable to many formats.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeDescriptor {
    pub name: String,
    pub id: String,
    pub naming: ModeNaming,
    pub aliases: Vec<String>,
    /// Command name -> hook name
    pub commands: IndexMap<String, String>,
    /// `start()` is a no-op below this many players
    pub min_players: usize,
    pub description: String,
    /// Layer stacked on top of the format's layers
    pub install: Option<LayerFactory>,
}

impl ModeDescriptor {
    pub fn new(name: impl Into<String>, naming: ModeNaming) -> Self {
        let name = name.into();
        Self {
            id: to_id(&name),
            name,
            naming,
            aliases: Vec::new(),
            commands: IndexMap::new(),
            min_players: 0,
            description: String::new(),
            install: None,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>, hook: impl Into<String>) -> Self {
        self.commands.insert(command.into(), hook.into());
        self
    }

    pub fn with_min_players(mut self, min_players: usize) -> Self {
        self.min_players = min_players;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_install(mut self, install: LayerFactory) -> Self {
        self.install = Some(install);
        self
    }

    /// Display id of this mode applied to a format name or alias.
    pub fn display_id(&self, format_name: &str) -> String {
        self.naming.compose(&self.name, format_name)
    }
}

/// A catalog-registered game format.
///
/// After resolution the descriptor travels with the session as its
/// configuration; the registry's stored copy is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDescriptor {
    pub name: String,
    pub id: String,
    pub description: String,
    /// Parent format id
    pub inherits: Option<String>,
    /// Set on resolved copies when a variation was selected
    pub variation_id: Option<String>,
    /// Set on resolved copies when a mode was selected
    pub mode_id: Option<String>,
    /// Exists only to be inherited from; never resolvable
    pub inherit_only: bool,
    /// Resolvable but hidden from listings
    pub internal: bool,
    /// No signup phase; anyone may play as soon as the game starts
    pub free_join: bool,
    /// Keyed by normalized variation key
    pub variations: IndexMap<String, VariationDescriptor>,
    /// Variation selector alias -> variation key (filled by the registry)
    pub variation_aliases: IndexMap<String, String>,
    /// Mode id -> mode id
    pub modes: IndexMap<String, String>,
    /// Mode alias -> mode id (filled by the registry)
    pub mode_aliases: IndexMap<String, String>,
    pub aliases: Vec<String>,
    /// Command name -> hook name
    pub commands: IndexMap<String, String>,
    pub private_commands: PrivateCommands,
    pub settings: BTreeMap<String, String>,
    /// Composable behavior: one layer on top of whatever it inherits
    pub install: Option<LayerFactory>,
    /// Standalone behavior: used as-is, cannot be inherited from
    pub game: Option<LayerFactory>,
}

impl FormatDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: to_id(&name),
            name,
            description: String::new(),
            inherits: None,
            variation_id: None,
            mode_id: None,
            inherit_only: false,
            internal: false,
            free_join: false,
            variations: IndexMap::new(),
            variation_aliases: IndexMap::new(),
            modes: IndexMap::new(),
            mode_aliases: IndexMap::new(),
            aliases: Vec::new(),
            commands: IndexMap::new(),
            private_commands: PrivateCommands::None,
            settings: BTreeMap::new(),
            install: None,
            game: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_inherits(mut self, parent: impl AsRef<str>) -> Self {
        self.inherits = Some(to_id(parent.as_ref()));
        self
    }

    pub fn inherit_only(mut self) -> Self {
        self.inherit_only = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn with_free_join(mut self, free_join: bool) -> Self {
        self.free_join = free_join;
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_variation(mut self, variation: VariationDescriptor) -> Self {
        self.variations.insert(variation.key(), variation);
        self
    }

    pub fn with_mode(mut self, mode: impl AsRef<str>) -> Self {
        let mode = to_id(mode.as_ref());
        self.modes.insert(mode.clone(), mode);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>, hook: impl Into<String>) -> Self {
        self.commands.insert(command.into(), hook.into());
        self
    }

    pub fn with_private_commands(mut self, private_commands: PrivateCommands) -> Self {
        self.private_commands = private_commands;
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_install(mut self, install: LayerFactory) -> Self {
        self.install = Some(install);
        self
    }

    pub fn with_game(mut self, game: LayerFactory) -> Self {
        self.game = Some(game);
        self
    }

    /// Parse a setting, e.g. `format.setting::<u64>("round_secs")`.
    pub fn setting<T: FromStr>(&self, key: &str) -> Option<T> {
        self.settings.get(key).and_then(|v| v.parse().ok())
    }

    pub fn setting_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.setting(key).unwrap_or(default)
    }

    /// Overlay a variation's fields onto this (working copy) descriptor.
    pub fn merge_variation(&mut self, variation: &VariationDescriptor) {
        self.name = variation.name.clone();
        self.id = variation.id.clone();
        self.variation_id = Some(variation.key());
        if let Some(description) = &variation.description {
            self.description = description.clone();
        }
        if let Some(free_join) = variation.free_join {
            self.free_join = free_join;
        }
        for (key, value) in &variation.settings {
            self.settings.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_naming_compose() {
        assert_eq!(ModeNaming::Suffix.compose("Team", "Trivia"), "triviateam");
        assert_eq!(ModeNaming::Prefix.compose("Survival", "Trivia"), "survivaltrivia");
    }

    #[test]
    fn test_private_commands_allows() {
        assert!(!PrivateCommands::None.allows("guess"));
        assert!(PrivateCommands::All.allows("anything"));
        let only = PrivateCommands::Only(vec!["Guess".to_string()]);
        assert!(only.allows("guess"));
        assert!(!only.allows("hint"));
    }

    #[test]
    fn test_builder_normalizes_keys() {
        let format = FormatDescriptor::new("Trivia")
            .with_inherits("Guessing Games")
            .with_mode("Team")
            .with_variation(VariationDescriptor::new("Reverse Trivia", "Reverse"));

        assert_eq!(format.id, "trivia");
        assert_eq!(format.inherits.as_deref(), Some("guessinggames"));
        assert_eq!(format.modes.get("team").map(String::as_str), Some("team"));
        assert!(format.variations.contains_key("reverse"));
    }

    #[test]
    fn test_merge_variation_overrides_only_its_fields() {
        let mut format = FormatDescriptor::new("Trivia")
            .with_description("Answer questions")
            .with_setting("goal", "3")
            .with_setting("round_secs", "20")
            .with_aliases(&["quiz"]);
        let variation = VariationDescriptor::new("Reverse Trivia", "Reverse")
            .with_description("Name the question")
            .with_setting("reverse", "true")
            .with_setting("goal", "5");

        format.merge_variation(&variation);

        assert_eq!(format.name, "Reverse Trivia");
        assert_eq!(format.id, "reversetrivia");
        assert_eq!(format.variation_id.as_deref(), Some("reverse"));
        assert_eq!(format.description, "Name the question");
        assert_eq!(format.setting::<u32>("goal"), Some(5));
        assert_eq!(format.setting::<u32>("round_secs"), Some(20));
        assert_eq!(format.setting::<bool>("reverse"), Some(true));
        assert_eq!(format.aliases, vec!["quiz".to_string()]);
        assert!(!format.free_join);
    }

    #[test]
    fn test_setting_or_falls_back_on_parse_failure() {
        let format = FormatDescriptor::new("X").with_setting("goal", "many");
        assert_eq!(format.setting_or("goal", 3u32), 3);
        assert_eq!(format.setting_or("missing", 7u32), 7);
    }
}
