//! Validation of plugin configuration against its declared parameters.
//!
//! Pure functions: nothing here reads the environment or mutates state.
//! Callers pass in which keys currently hold values and decide what to do
//! with the outcome.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{PluginCategory, PluginParamDef, ValidationIssue};

/// Keys a plugin may never set, even when its manifest declares them.
pub const BLOCKED_CONFIG_KEYS: &[&str] = &[
    "STEWARD_API_TOKEN",
    "STEWARD_API_BIND",
    "STEWARD_STATE_DIR",
    "PATH",
    "HOME",
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
];

pub fn is_blocked_key(key: &str) -> bool {
    BLOCKED_CONFIG_KEYS.contains(&key)
}

pub struct ValidationRequest<'a> {
    pub plugin_id: &'a str,
    pub category: PluginCategory,
    pub env_key: Option<&'a str>,
    pub config_keys: &'a [String],
    /// Proposed key/value mutation, if this is a write.
    pub candidate: Option<&'a BTreeMap<String, String>>,
    pub parameters: &'a [PluginParamDef],
    /// Keys that currently hold a non-empty value.
    pub configured_keys: &'a [String],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginValidation {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Rejections for a config mutation: blocked keys first, then keys the
/// plugin never declared.
pub fn resolve_config_mutation_rejections(
    declared_keys: &[String],
    candidate: &BTreeMap<String, String>,
) -> Vec<ValidationIssue> {
    let mut rejections = Vec::new();

    for key in candidate.keys() {
        if is_blocked_key(key) {
            rejections.push(ValidationIssue::new(
                key,
                format!("{} is blocked for security reasons", key),
            ));
            continue;
        }

        if !declared_keys.iter().any(|k| k == key) {
            rejections.push(ValidationIssue::new(
                key,
                format!("{} is not a declared config key for this plugin", key),
            ));
        }
    }

    rejections
}

pub fn validate_plugin_config(request: &ValidationRequest<'_>) -> PluginValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(candidate) = request.candidate {
        errors.extend(resolve_config_mutation_rejections(request.config_keys, candidate));
    }

    let is_set = |key: &str| {
        request.configured_keys.iter().any(|k| k == key)
            || request
                .candidate
                .and_then(|c| c.get(key))
                .is_some_and(|v| !v.trim().is_empty())
    };

    let missing: Vec<&PluginParamDef> = request
        .parameters
        .iter()
        .filter(|p| p.required && p.default.is_none() && !is_set(p.key.as_str()))
        .collect();

    let mut escalated = false;
    if request.category == PluginCategory::AiProvider {
        let mut credentials: Vec<&str> = request
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.key.as_str())
            .collect();
        if credentials.is_empty() {
            credentials.extend(request.env_key);
        }

        if !credentials.is_empty() && !credentials.iter().any(|k| is_set(*k)) {
            let field = request.env_key.unwrap_or(credentials[0]);
            errors.push(ValidationIssue::new(
                field,
                format!(
                    "{} has no credentials configured; set one of: {}",
                    request.plugin_id,
                    credentials.join(", ")
                ),
            ));
            escalated = true;
        }
    }

    if !escalated {
        for param in missing {
            warnings.push(ValidationIssue::new(
                &param.key,
                format!("{} is required but not set", param.key),
            ));
        }
    }

    PluginValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}
