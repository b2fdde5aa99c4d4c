//! Layered configuration loader with requirement constraints.
//!
//! Discovers configuration layers (system/user/project/cwd/runtime), validates
//! each against the schema, merges them under optional requirement locks, and
//! produces the effective `ScribeConfig`.

mod layers;
mod merge;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, ScribeConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "scribe.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".scribe";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/scribe/scribe.json5";
#[cfg(unix)]
/// Default requirements path on Unix.
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/scribe/requirements.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: ScribeConfig,
    /// Metadata for each layer that contributed.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// Locked values that later layers cannot override.
    Requirements,
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Project root configuration.
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find local layers.
    pub cwd: PathBuf,
    /// Optional system config path (defaults to `/etc/scribe/scribe.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.scribe/scribe.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Optional requirements path holding locked settings.
    pub requirements_path: Option<PathBuf>,
    /// Runtime override config paths applied last.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layers::default_system_config_path(),
            user_config_path: layers::default_user_config_path(),
            requirements_path: layers::default_requirements_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl ScribeConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Layer precedence (low -> high): system, user, project, cwd, runtime.
    /// Keys present in the requirements layer are locked to its values.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layers::normalize_path(&options.cwd)?;
        let mut seen = HashSet::new();
        let mut loaded = Vec::new();

        let requirements = match options.requirements_path.as_deref() {
            Some(path) => layers::read_optional(ConfigLayerSource::Requirements, path)?,
            None => None,
        };

        let mut candidates: Vec<(ConfigLayerSource, PathBuf)> = Vec::new();
        if let Some(path) = options.system_config_path.clone() {
            candidates.push((ConfigLayerSource::System, path));
        }
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        match layers::find_project_root(&cwd, &options.project_root_markers) {
            Some(root) => {
                debug!("resolved project root: {}", root.display());
                candidates.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE)));
            }
            None => debug!("project root not found; skipping project layer"),
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));

        for (source, path) in candidates {
            if !seen.insert(layers::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layers::read_optional(source, &path)? {
                loaded.push(layer);
            }
        }
        for path in &options.runtime_paths {
            loaded.push(layers::read_required(ConfigLayerSource::Runtime, path)?);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        let mut metadata = Vec::new();
        let locks = requirements.as_ref().map(|layer| &layer.value);
        for layer in &loaded {
            merge::overlay(&mut merged, &layer.value, locks);
            metadata.push(layer.meta.clone());
        }
        if let Some(requirements) = requirements.as_ref() {
            merge::overlay(&mut merged, &requirements.value, None);
            metadata.insert(0, requirements.meta.clone());
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", metadata.len());
        Ok(LayeredConfig {
            config,
            layers: metadata,
        })
    }

    /// Validate invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ledger = &self.ledger;
        if ledger.index_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ledger.index_key must not be empty".to_string(),
            ));
        }
        if ledger.record_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "ledger.record_prefix must not be empty".to_string(),
            ));
        }
        if ledger.index_key == ledger.record_prefix {
            return Err(ConfigError::Invalid(format!(
                "ledger.index_key `{}` must differ from record_prefix",
                ledger.index_key
            )));
        }
        if ledger.deadline_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "ledger.deadline_ms must be positive".to_string(),
            ));
        }
        if self.analysis.recommendations.is_empty() {
            return Err(ConfigError::Invalid(
                "analysis.recommendations must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A parsed layer and where it came from.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<ScribeConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: ScribeConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
