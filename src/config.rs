//! Store configuration
//!
//! Read from a JSON file; every field is optional:
//!
//! ```json
//! {
//!   "registry_path": "fields.json",
//!   "require_non_empty_load": false,
//!   "remove_column_policy": "full_revalidate",
//!   "log_level": "warn",
//!   "max_listeners": 64
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{GridError, GridResult};
use crate::observability::{emit, Event, Logger, Severity};
use crate::schema::FieldRegistry;

/// What `remove_columns` re-validates after stripping the fields.
///
/// Both policies produce the same error index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveColumnPolicy {
    /// Re-validate every remaining field of every row
    #[default]
    FullRevalidate,
    /// Only drop the removed fields from the error index
    FieldLocal,
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Registry file; the built-in BIDS registry is used when absent
    #[serde(default)]
    pub registry_path: Option<String>,

    /// Reject loads with no rows
    #[serde(default)]
    pub require_non_empty_load: bool,

    /// Re-validation after column removal
    #[serde(default)]
    pub remove_column_policy: RemoveColumnPolicy,

    /// Lowest logged severity
    #[serde(default = "default_log_level")]
    pub log_level: Severity,

    /// Maximum number of concurrent subscribers
    #[serde(default = "default_max_listeners")]
    pub max_listeners: usize,
}

fn default_log_level() -> Severity {
    Severity::Warn
}

fn default_max_listeners() -> usize {
    64
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            registry_path: None,
            require_non_empty_load: false,
            remove_column_policy: RemoveColumnPolicy::default(),
            log_level: default_log_level(),
            max_listeners: default_max_listeners(),
        }
    }
}

impl GridConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> GridResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GridError::config(format!("Failed to read config: {}", e)))?;
        let config = Self::from_json_str(&content)?;
        emit(
            Event::ConfigLoaded,
            &[("path", &path.display().to_string())],
        );
        Ok(config)
    }

    /// Parse configuration from JSON text
    pub fn from_json_str(content: &str) -> GridResult<Self> {
        let config: GridConfig = serde_json::from_str(content)
            .map_err(|e| GridError::config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> GridResult<()> {
        if self.max_listeners == 0 {
            return Err(GridError::config("max_listeners must be > 0"));
        }
        if let Some(path) = &self.registry_path {
            if path.trim().is_empty() {
                return Err(GridError::config("registry_path must not be empty"));
            }
        }
        Ok(())
    }

    /// Applies the log threshold process-wide
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.log_level);
    }

    /// Builds the configured field registry
    pub fn build_registry(&self) -> GridResult<FieldRegistry> {
        let registry = match &self.registry_path {
            Some(path) => FieldRegistry::load(Path::new(path))?,
            None => FieldRegistry::bids_default()?,
        };
        emit(
            Event::RegistryLoaded,
            &[
                ("fields", &registry.len().to_string()),
                ("source", self.registry_path.as_deref().unwrap_or("builtin")),
            ],
        );
        Ok(registry)
    }
}
