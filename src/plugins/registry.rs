use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::manifest::load_manifest;
use super::mask::mask_value;
use super::validation::{validate_plugin_config, PluginValidation, ValidationRequest};
use crate::environment::Environment;
use crate::types::{PluginEntry, ValidationIssue};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginUpdate {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub config: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Plugin \"{0}\" not found")]
    NotFound(String),

    #[error("Plugin \"{id}\" rejected the supplied config")]
    Rejected {
        id: String,
        plugin: Box<PluginEntry>,
        errors: Vec<ValidationIssue>,
    },
}

/// Catalog of manifest-declared plugins with their live configuration state.
///
/// Parameter values, `configured` and validation results are recomputed on
/// every read so the view always reflects the current environment.
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
    env: Arc<dyn Environment>,
}

impl PluginRegistry {
    pub fn new(entries: Vec<PluginEntry>, env: Arc<dyn Environment>) -> Self {
        let mut registry = Self { entries, env };
        for entry in &mut registry.entries {
            refresh_entry(entry, registry.env.as_ref());
        }
        registry
    }

    /// Load the catalog from a manifest file. A missing or unreadable
    /// manifest leaves the catalog empty.
    pub fn from_manifest(path: &Path, env: Arc<dyn Environment>) -> Self {
        match load_manifest(path) {
            Ok(manifest) => Self::new(manifest.into_entries(), env),
            Err(e) => {
                tracing::debug!("Plugin manifest unavailable ({:#}); catalog is empty", e);
                Self::new(Vec::new(), env)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh view of every plugin. `loaded_plugins` is the live runtime's
    /// plugin name list; without a runtime the stored enabled flags are kept.
    pub fn list(&mut self, loaded_plugins: Option<&[String]>) -> Vec<PluginEntry> {
        for entry in &mut self.entries {
            if let Some(loaded) = loaded_plugins {
                entry.enabled = is_plugin_loaded(&entry.id, loaded);
            }
            refresh_entry(entry, self.env.as_ref());
        }
        self.entries.clone()
    }

    /// Toggle a plugin and/or apply config. Config is validated first and
    /// nothing is written unless every key passes.
    pub fn update(&mut self, id: &str, update: PluginUpdate) -> Result<PluginEntry, RegistryError> {
        let env = self.env.clone();
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        refresh_entry(entry, env.as_ref());

        if let Some(config) = &update.config {
            let outcome = validate_entry(entry, env.as_ref(), Some(config));
            if !outcome.valid {
                return Err(RegistryError::Rejected {
                    id: id.to_string(),
                    plugin: Box::new(entry.clone()),
                    errors: outcome.errors,
                });
            }
        }

        if let Some(enabled) = update.enabled {
            entry.enabled = enabled;
        }

        if let Some(config) = update.config {
            for (key, value) in config.iter().filter(|(_, v)| !v.is_empty()) {
                env.set(key, value);
            }
            entry.config_applied = true;
            tracing::info!(plugin = %id, keys = config.len(), "Applied plugin config");
        }

        refresh_entry(entry, env.as_ref());
        Ok(entry.clone())
    }
}

/// Runtime plugin names match by exact id, `plugin-<id>`, or a path ending
/// in `/plugin-<id>`.
pub fn is_plugin_loaded(id: &str, loaded: &[String]) -> bool {
    let suffix = format!("plugin-{}", id);
    let path_suffix = format!("/{}", suffix);
    loaded
        .iter()
        .any(|name| name == id || *name == suffix || name.ends_with(&path_suffix))
}

fn configured_keys(entry: &PluginEntry, env: &dyn Environment) -> Vec<String> {
    entry
        .config_keys
        .iter()
        .chain(entry.parameters.iter().map(|p| &p.key))
        .chain(entry.env_key.iter())
        .filter(|k| env.get_non_empty(k).is_some())
        .cloned()
        .collect()
}

fn validate_entry(
    entry: &PluginEntry,
    env: &dyn Environment,
    candidate: Option<&BTreeMap<String, String>>,
) -> PluginValidation {
    let configured = configured_keys(entry, env);
    validate_plugin_config(&ValidationRequest {
        plugin_id: &entry.id,
        category: entry.category,
        env_key: entry.env_key.as_deref(),
        config_keys: &entry.config_keys,
        candidate,
        parameters: &entry.parameters,
        configured_keys: &configured,
    })
}

fn refresh_entry(entry: &mut PluginEntry, env: &dyn Environment) {
    for param in &mut entry.parameters {
        let value = env.get_non_empty(&param.key);
        param.is_set = value.is_some();
        param.current_value = value.map(|v| if param.sensitive { mask_value(&v) } else { v });
    }

    entry.configured = entry.config_keys.is_empty()
        || match &entry.env_key {
            Some(key) => env.get_non_empty(key).is_some(),
            None => entry.config_applied,
        };

    let outcome = validate_entry(entry, env, None);
    entry.validation_errors = outcome.errors;
    entry.validation_warnings = outcome.warnings;
}
