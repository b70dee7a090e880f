//! Format registry: one-time catalog load and validation
//!
//! Loading is a single ordered pass:
//! 1. ingest every format descriptor
//! 2. ingest every mode, claiming its commands and aliases
//! 3. validate each format (behavior, inheritance), claim its commands and
//!    aliases, normalize its variations and mode attachments
//!
//! Every conflict is first-writer-wins: a later claimant either agrees with
//! what is already registered or the load fails. Nothing is overwritten.
//! After `load` returns the registry is read-only.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, CatalogSource};
use crate::format::{FormatDescriptor, ModeDescriptor};
use crate::id::to_id;

/// Unrecoverable catalog errors, raised while loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Duplicate format id '{0}'")]
    DuplicateFormat(String),
    #[error("Duplicate mode id '{0}'")]
    DuplicateMode(String),
    #[error("Format '{format}' declares neither `install` nor `game`")]
    MissingBehavior { format: String },
    #[error("Format '{format}' declares both `install` and `game`")]
    ConflictingBehavior { format: String },
    #[error("Inherit-only format '{format}' must declare `install`")]
    InheritOnlyWithoutInstall { format: String },
    #[error("Format '{format}' inherits from unknown format '{parent}'")]
    UnknownParent { format: String, parent: String },
    #[error("Format '{format}' cannot inherit from itself")]
    SelfInheritance { format: String },
    #[error("Format '{format}' inherits from '{parent}', which has no `install`")]
    ParentNotComposable { format: String, parent: String },
    #[error("Command '{command}' maps to '{existing}' ({owner}) but {claimant} maps it to '{hook}'")]
    CommandConflict {
        command: String,
        existing: String,
        owner: CommandOwner,
        hook: String,
        claimant: CommandOwner,
    },
    #[error("Command '{command}' of {claimant} shadows a platform command")]
    ReservedCommand {
        command: String,
        claimant: CommandOwner,
    },
    #[error("Alias '{alias}' of mode '{mode}' collides with a mode id")]
    ModeAliasConflict { mode: String, alias: String },
    #[error("Variation '{variation}' of '{format}' collides with a format id")]
    VariationShadowsFormat { format: String, variation: String },
    #[error("Variation key '{key}' of '{format}' collides with a mode id")]
    VariationShadowsMode { format: String, key: String },
    #[error("Format '{format}' attaches unknown mode '{mode}'")]
    UnknownMode { format: String, mode: String },
    #[error("Alias '{alias}' of '{owner}' collides with a format id")]
    AliasShadowsFormat { alias: String, owner: String },
    #[error("Alias '{alias}' points at '{existing}' and '{target}'")]
    AliasConflict {
        alias: String,
        existing: String,
        target: String,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Who declared a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOwner {
    Format(String),
    Mode(String),
}

impl fmt::Display for CommandOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOwner::Format(id) => write!(f, "format '{id}'"),
            CommandOwner::Mode(id) => write!(f, "mode '{id}'"),
        }
    }
}

/// Where a command goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub hook: String,
    pub owner: CommandOwner,
}

/// Command name -> hook, unique across the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    routes: IndexMap<String, Route>,
}

impl CommandTable {
    /// Claim `command` (and, if different, the hook's own name) for `hook`.
    ///
    /// Re-declaring an identical mapping is allowed; mapping an existing name
    /// to a different hook, or claiming a reserved platform command, is not.
    fn claim(
        &mut self,
        command: &str,
        hook: &str,
        owner: &CommandOwner,
        reserved: &HashSet<String>,
    ) -> Result<(), LoadError> {
        let command = to_id(command);
        let hook = to_id(hook);
        let mut names = vec![command];
        if names[0] != hook {
            names.push(hook.clone());
        }

        for name in names {
            if let Some(existing) = self.routes.get(&name) {
                if existing.hook != hook {
                    return Err(LoadError::CommandConflict {
                        command: name,
                        existing: existing.hook.clone(),
                        owner: existing.owner.clone(),
                        hook,
                        claimant: owner.clone(),
                    });
                }
                continue;
            }
            if reserved.contains(&name) {
                return Err(LoadError::ReservedCommand {
                    command: name,
                    claimant: owner.clone(),
                });
            }
            debug!(command = %name, hook = %hook, owner = %owner, "Registered game command");
            self.routes.insert(
                name,
                Route {
                    hook: hook.clone(),
                    owner: owner.clone(),
                },
            );
        }
        Ok(())
    }

    pub fn route(&self, command: &str) -> Option<&Route> {
        self.routes.get(&to_id(command))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Route)> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// The loaded catalog.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    pub(crate) formats: IndexMap<String, FormatDescriptor>,
    pub(crate) modes: IndexMap<String, ModeDescriptor>,
    /// Mode alias -> mode id
    mode_aliases: IndexMap<String, String>,
    /// Alias -> `id` or `id,variationOrMode`
    pub(crate) aliases: IndexMap<String, String>,
    commands: CommandTable,
    reserved: HashSet<String>,
}

impl FormatRegistry {
    /// Load from several catalog sources, in order.
    ///
    /// A source that cannot be enumerated (e.g. a missing data directory)
    /// contributes nothing; a source with a broken definition fails the load.
    pub fn load(sources: &[&dyn CatalogSource], reserved: &[&str]) -> Result<Self, LoadError> {
        let mut formats = Vec::new();
        let mut modes = Vec::new();

        for source in sources {
            match source.enumerate() {
                Ok(catalog) => {
                    debug!(
                        source = %source.describe(),
                        formats = catalog.formats.len(),
                        modes = catalog.modes.len(),
                        "Enumerated catalog source"
                    );
                    formats.extend(catalog.formats);
                    modes.extend(catalog.modes);
                }
                Err(e) if e.is_enumeration_failure() => {
                    warn!(source = %source.describe(), error = %e, "Catalog source unavailable, treating as empty");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Self::from_descriptors(formats, modes, reserved)
    }

    /// Run the validation and merge pass over already-enumerated descriptors.
    pub fn from_descriptors(
        formats: Vec<FormatDescriptor>,
        modes: Vec<ModeDescriptor>,
        reserved: &[&str],
    ) -> Result<Self, LoadError> {
        let mut registry = Self {
            reserved: reserved.iter().map(|c| to_id(c)).collect(),
            ..Self::default()
        };

        registry.ingest_formats(formats)?;
        registry.ingest_modes(modes)?;

        let mut formats = std::mem::take(&mut registry.formats);
        let composable: HashMap<String, bool> = formats
            .iter()
            .map(|(id, format)| (id.clone(), format.install.is_some()))
            .collect();
        for format in formats.values_mut() {
            registry.normalize_format(format, &composable)?;
        }
        registry.formats = formats;

        info!(
            formats = registry.formats.len(),
            modes = registry.modes.len(),
            aliases = registry.aliases.len(),
            commands = registry.commands.len(),
            "Format catalog loaded"
        );
        Ok(registry)
    }

    fn ingest_formats(&mut self, formats: Vec<FormatDescriptor>) -> Result<(), LoadError> {
        for mut format in formats {
            if format.id.is_empty() {
                format.id = to_id(&format.name);
            }
            if self.formats.contains_key(&format.id) {
                return Err(LoadError::DuplicateFormat(format.id));
            }
            self.formats.insert(format.id.clone(), format);
        }
        Ok(())
    }

    fn ingest_modes(&mut self, modes: Vec<ModeDescriptor>) -> Result<(), LoadError> {
        for mut mode in modes {
            if mode.id.is_empty() {
                mode.id = to_id(&mode.name);
            }
            if self.modes.contains_key(&mode.id) {
                return Err(LoadError::DuplicateMode(mode.id));
            }
            if self.mode_aliases.contains_key(&mode.id) {
                return Err(LoadError::ModeAliasConflict {
                    mode: self.mode_aliases[&mode.id].clone(),
                    alias: mode.id,
                });
            }

            let owner = CommandOwner::Mode(mode.id.clone());
            for (command, hook) in &mode.commands {
                self.commands.claim(command, hook, &owner, &self.reserved)?;
            }

            for alias in &mode.aliases {
                let alias = to_id(alias);
                if alias == mode.id {
                    continue;
                }
                if self.modes.contains_key(&alias) {
                    return Err(LoadError::ModeAliasConflict {
                        mode: mode.id.clone(),
                        alias,
                    });
                }
                self.mode_aliases
                    .entry(alias)
                    .or_insert_with(|| mode.id.clone());
            }

            self.modes.insert(mode.id.clone(), mode);
        }
        Ok(())
    }

    fn normalize_format(
        &mut self,
        format: &mut FormatDescriptor,
        composable: &HashMap<String, bool>,
    ) -> Result<(), LoadError> {
        let id = format.id.clone();

        if format.inherit_only {
            if format.install.is_none() {
                return Err(LoadError::InheritOnlyWithoutInstall { format: id });
            }
        } else {
            match (format.install.is_some(), format.game.is_some()) {
                (false, false) => return Err(LoadError::MissingBehavior { format: id }),
                (true, true) => return Err(LoadError::ConflictingBehavior { format: id }),
                _ => {}
            }
        }

        if let Some(parent) = &format.inherits {
            let parent = to_id(parent);
            if parent == id {
                return Err(LoadError::SelfInheritance { format: id });
            }
            match composable.get(&parent) {
                None => return Err(LoadError::UnknownParent { format: id, parent }),
                Some(false) => return Err(LoadError::ParentNotComposable { format: id, parent }),
                Some(true) => format.inherits = Some(parent),
            }
        }

        let owner = CommandOwner::Format(id.clone());
        for (command, hook) in &format.commands {
            self.commands.claim(command, hook, &owner, &self.reserved)?;
        }

        for alias in &format.aliases {
            let alias = to_id(alias);
            if alias.is_empty() || alias == id {
                continue;
            }
            if composable.contains_key(&alias) {
                return Err(LoadError::AliasShadowsFormat { alias, owner: id });
            }
            match self.aliases.get(&alias) {
                Some(existing) if *existing != id => {
                    warn!(alias = %alias, existing = %existing, format = %id, "Alias already claimed, keeping first");
                }
                Some(_) => {}
                None => {
                    self.aliases.insert(alias, id.clone());
                }
            }
        }

        for (key, variation) in format.variations.iter_mut() {
            variation.id = to_id(&variation.name);
            if composable.contains_key(&variation.id) {
                return Err(LoadError::VariationShadowsFormat {
                    format: id,
                    variation: variation.id.clone(),
                });
            }
            if self.modes.contains_key(key) {
                return Err(LoadError::VariationShadowsMode {
                    format: id,
                    key: key.clone(),
                });
            }

            let target = format!("{id},{key}");
            for alias in &variation.aliases {
                self.claim_composite(to_id(alias), &target, composable)?;
            }
            for alias in &variation.variation_aliases {
                format
                    .variation_aliases
                    .entry(to_id(alias))
                    .or_insert_with(|| key.clone());
            }
            self.claim_composite(variation.id.clone(), &target, composable)?;
        }

        let mode_ids: Vec<String> = format.modes.keys().cloned().collect();
        for mode_id in mode_ids {
            let mode_id = self.mode_aliases.get(&mode_id).cloned().unwrap_or(mode_id);
            let Some(mode) = self.modes.get(&mode_id) else {
                return Err(LoadError::UnknownMode {
                    format: id,
                    mode: mode_id,
                });
            };

            let target = format!("{id},{mode_id}");
            let mut format_names = vec![format.name.clone()];
            format_names.extend(format.aliases.iter().cloned());
            let mut mode_names = vec![mode.name.clone()];
            mode_names.extend(mode.aliases.iter().cloned());

            let mut claims = Vec::new();
            for mode_name in &mode_names {
                let alias = to_id(mode_name);
                if alias != mode_id {
                    format
                        .mode_aliases
                        .entry(alias)
                        .or_insert_with(|| mode_id.clone());
                }
                for format_name in &format_names {
                    claims.push(mode.naming.compose(mode_name, format_name));
                }
            }
            for alias in claims {
                self.claim_composite(alias, &target, composable)?;
            }
        }
        // Attachments declared through a mode alias are stored under the id
        format.modes = format
            .modes
            .keys()
            .map(|m| {
                let m = self.mode_aliases.get(m).cloned().unwrap_or_else(|| m.clone());
                (m.clone(), m)
            })
            .collect();

        Ok(())
    }

    fn claim_composite(
        &mut self,
        alias: String,
        target: &str,
        composable: &HashMap<String, bool>,
    ) -> Result<(), LoadError> {
        if composable.contains_key(&alias) {
            return Err(LoadError::AliasShadowsFormat {
                alias,
                owner: target.to_string(),
            });
        }
        match self.aliases.get(&alias) {
            Some(existing) if existing != target => Err(LoadError::AliasConflict {
                alias,
                existing: existing.clone(),
                target: target.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.aliases.insert(alias, target.to_string());
                Ok(())
            }
        }
    }

    pub fn format(&self, id: &str) -> Option<&FormatDescriptor> {
        self.formats.get(&to_id(id))
    }

    pub fn mode(&self, id: &str) -> Option<&ModeDescriptor> {
        let id = to_id(id);
        self.modes
            .get(&id)
            .or_else(|| self.mode_aliases.get(&id).and_then(|m| self.modes.get(m)))
    }

    /// Formats a user may start: not inherit-only, not internal.
    pub fn listed_formats(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.formats
            .values()
            .filter(|f| !f.inherit_only && !f.internal)
    }

    pub fn modes(&self) -> impl Iterator<Item = &ModeDescriptor> {
        self.modes.values()
    }

    pub fn alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(&to_id(alias)).map(String::as_str)
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn is_reserved(&self, command: &str) -> bool {
        self.reserved.contains(&to_id(command))
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}
