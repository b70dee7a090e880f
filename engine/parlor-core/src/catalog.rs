//! Catalog sources: where format and mode descriptors come from
//!
//! Two sources ship with the core:
//! - [`StaticCatalog`]: descriptors built in code
//! - [`TomlCatalog`]: data files in a directory, with behavior bound by name
//!   through a [`BehaviorTable`]
//!
//! A data file may declare any number of formats and modes:
//!
//! ```toml
//! [[format]]
//! name = "Capitals"
//! inherits = "trivia"
//! install = "trivia"
//! aliases = ["caps"]
//! modes = ["team"]
//!
//! [format.settings]
//! goal = 5
//!
//! [[format.variations]]
//! name = "Reverse Capitals"
//! variation = "Reverse"
//! variation_aliases = ["rev"]
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::format::{
    FormatDescriptor, ModeDescriptor, ModeNaming, PrivateCommands, VariationDescriptor,
};
use crate::id::to_id;
use crate::layer::LayerFactory;

/// Errors produced while enumerating a catalog source.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to list catalog at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{path}: '{owner}' binds unknown behavior '{behavior}'")]
    UnknownBehavior {
        path: PathBuf,
        owner: String,
        behavior: String,
    },
}

impl CatalogError {
    /// The source could not be listed at all, as opposed to listing a
    /// broken definition.
    pub fn is_enumeration_failure(&self) -> bool {
        matches!(self, CatalogError::Io { .. })
    }
}

/// Everything one source contributes.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub formats: Vec<FormatDescriptor>,
    pub modes: Vec<ModeDescriptor>,
}

pub trait CatalogSource {
    fn enumerate(&self) -> Result<Catalog, CatalogError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Descriptors defined in code.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    catalog: Catalog,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FormatDescriptor) -> Self {
        self.catalog.formats.push(format);
        self
    }

    pub fn with_mode(mut self, mode: ModeDescriptor) -> Self {
        self.catalog.modes.push(mode);
        self
    }
}

impl CatalogSource for StaticCatalog {
    fn enumerate(&self) -> Result<Catalog, CatalogError> {
        Ok(self.catalog.clone())
    }

    fn describe(&self) -> String {
        "built-in catalog".to_string()
    }
}

/// Behavior names available to data files.
#[derive(Debug, Default, Clone)]
pub struct BehaviorTable {
    factories: IndexMap<String, LayerFactory>,
}

impl BehaviorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, factory: LayerFactory) -> Self {
        self.factories.insert(to_id(name), factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<LayerFactory> {
        self.factories.get(&to_id(name)).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// `*.toml` data files in one directory, read in file-name order.
#[derive(Debug, Clone)]
pub struct TomlCatalog {
    dir: PathBuf,
    behaviors: BehaviorTable,
}

impl TomlCatalog {
    pub fn new(dir: impl Into<PathBuf>, behaviors: BehaviorTable) -> Self {
        Self {
            dir: dir.into(),
            behaviors,
        }
    }

    fn read_file(&self, path: &Path, catalog: &mut Catalog) -> Result<(), CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CatalogFile = toml::from_str(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for mode in file.mode {
            catalog.modes.push(self.bind_mode(path, mode)?);
        }
        for format in file.format {
            catalog.formats.push(self.bind_format(path, format)?);
        }
        Ok(())
    }

    fn bind(
        &self,
        path: &Path,
        owner: &str,
        name: Option<String>,
    ) -> Result<Option<LayerFactory>, CatalogError> {
        let Some(name) = name else {
            return Ok(None);
        };
        self.behaviors
            .get(&name)
            .map(Some)
            .ok_or_else(|| CatalogError::UnknownBehavior {
                path: path.to_path_buf(),
                owner: owner.to_string(),
                behavior: name,
            })
    }

    fn bind_format(&self, path: &Path, data: FormatData) -> Result<FormatDescriptor, CatalogError> {
        let install = self.bind(path, &data.name, data.install)?;
        let game = self.bind(path, &data.name, data.game)?;

        let mut format = FormatDescriptor::new(&data.name);
        if let Some(id) = data.id {
            format.id = to_id(&id);
        }
        format.description = data.description;
        format.inherits = data.inherits.as_deref().map(to_id);
        format.inherit_only = data.inherit_only;
        format.internal = data.internal;
        format.free_join = data.free_join;
        format.aliases = data.aliases;
        format.commands = data.commands;
        format.private_commands = data.private_commands;
        format.settings = settings_to_strings(data.settings);
        format.install = install;
        format.game = game;
        for mode in data.modes {
            format = format.with_mode(mode);
        }
        for v in data.variations {
            let mut variation = VariationDescriptor::new(v.name, v.variation);
            variation.aliases = v.aliases;
            variation.variation_aliases = v.variation_aliases;
            variation.description = v.description;
            variation.free_join = v.free_join;
            variation.settings = settings_to_strings(v.settings);
            format = format.with_variation(variation);
        }
        Ok(format)
    }

    fn bind_mode(&self, path: &Path, data: ModeData) -> Result<ModeDescriptor, CatalogError> {
        let install = self.bind(path, &data.name, data.install)?;

        let mut mode = ModeDescriptor::new(&data.name, data.naming);
        if let Some(id) = data.id {
            mode.id = to_id(&id);
        }
        mode.aliases = data.aliases;
        mode.commands = data.commands;
        mode.min_players = data.min_players;
        mode.description = data.description;
        mode.install = install;
        Ok(mode)
    }
}

impl CatalogSource for TomlCatalog {
    fn enumerate(&self) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::default();
        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "No catalog directory, zero data formats");
            return Ok(catalog);
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| CatalogError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in &paths {
            self.read_file(path, &mut catalog)?;
        }
        debug!(
            dir = %self.dir.display(),
            files = paths.len(),
            formats = catalog.formats.len(),
            modes = catalog.modes.len(),
            "Read catalog directory"
        );
        Ok(catalog)
    }

    fn describe(&self) -> String {
        format!("catalog directory {}", self.dir.display())
    }
}

fn settings_to_strings(settings: BTreeMap<String, toml::Value>) -> BTreeMap<String, String> {
    settings
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

// ============================================================================
// Data file schema
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    format: Vec<FormatData>,
    mode: Vec<ModeData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FormatData {
    name: String,
    id: Option<String>,
    description: String,
    inherits: Option<String>,
    inherit_only: bool,
    internal: bool,
    free_join: bool,
    aliases: Vec<String>,
    modes: Vec<String>,
    variations: Vec<VariationData>,
    commands: IndexMap<String, String>,
    private_commands: PrivateCommands,
    settings: BTreeMap<String, toml::Value>,
    install: Option<String>,
    game: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VariationData {
    name: String,
    variation: String,
    aliases: Vec<String>,
    variation_aliases: Vec<String>,
    description: Option<String>,
    free_join: Option<bool>,
    settings: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModeData {
    name: String,
    id: Option<String>,
    naming: ModeNaming,
    aliases: Vec<String>,
    commands: IndexMap<String, String>,
    min_players: usize,
    description: String,
    install: Option<String>,
}
