//! The static plugin catalog (`plugins.json`), read once at startup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::types::{PluginCategory, PluginEntry, PluginParamDef};

const AI_PROVIDERS: &[&str] = &[
    "openai",
    "anthropic",
    "groq",
    "xai",
    "ollama",
    "openrouter",
    "google-genai",
    "local-ai",
    "vercel-ai-gateway",
    "deepseek",
    "together",
    "mistral",
    "cohere",
    "perplexity",
    "qwen",
    "minimax",
];

const CONNECTORS: &[&str] = &[
    "telegram",
    "discord",
    "slack",
    "whatsapp",
    "signal",
    "imessage",
    "bluebubbles",
    "farcaster",
    "bluesky",
    "matrix",
    "nostr",
    "msteams",
    "mattermost",
    "google-chat",
    "feishu",
    "line",
    "zalo",
    "zalouser",
    "tlon",
    "twitch",
    "nextcloud-talk",
    "instagram",
];

const DATABASES: &[&str] = &["sql", "localdb", "inmemorydb"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub plugins: Vec<PluginManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifestEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<PluginCategory>,
    #[serde(default)]
    pub env_key: Option<String>,
    #[serde(default)]
    pub config_keys: Vec<String>,
    #[serde(default)]
    pub plugin_parameters: BTreeMap<String, ManifestParameter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestParameter {
    #[serde(rename = "type", default)]
    pub param_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

pub fn load_manifest(path: &Path) -> Result<PluginManifest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plugin manifest: {}", path.display()))?;
    parse_manifest(&raw)
}

pub fn parse_manifest(raw: &str) -> Result<PluginManifest> {
    serde_json::from_str(raw).context("Failed to parse plugin manifest")
}

impl PluginManifest {
    /// Catalog entries sorted by name. Later entries reusing an id are dropped.
    pub fn into_entries(self) -> Vec<PluginEntry> {
        let mut seen = HashSet::new();
        let mut entries: Vec<PluginEntry> = self
            .plugins
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .map(PluginManifestEntry::into_entry)
            .collect();

        entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        entries
    }
}

impl PluginManifestEntry {
    fn into_entry(self) -> PluginEntry {
        let category = self.category.unwrap_or_else(|| categorize_plugin(&self.id));
        let env_key = self
            .env_key
            .filter(|k| !k.is_empty())
            .or_else(|| find_env_key(&self.config_keys));
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format_plugin_name(&self.id));

        let parameters = self
            .plugin_parameters
            .into_iter()
            .map(|(key, def)| PluginParamDef {
                key,
                param_type: def.param_type.unwrap_or_else(|| "string".to_string()),
                description: def.description.unwrap_or_default(),
                required: def.required,
                sensitive: def.sensitive,
                default: def.default.and_then(|v| match v {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                }),
                current_value: None,
                is_set: false,
            })
            .collect();

        PluginEntry {
            id: self.id,
            name,
            description: self.description,
            enabled: false,
            configured: false,
            env_key,
            category,
            config_keys: self.config_keys,
            parameters,
            validation_errors: Vec::new(),
            validation_warnings: Vec::new(),
            config_applied: false,
        }
    }
}

pub fn categorize_plugin(id: &str) -> PluginCategory {
    if AI_PROVIDERS.contains(&id) {
        PluginCategory::AiProvider
    } else if CONNECTORS.contains(&id) {
        PluginCategory::Connector
    } else if DATABASES.contains(&id) {
        PluginCategory::Database
    } else {
        PluginCategory::Feature
    }
}

/// First declared key that looks like a credential.
pub fn find_env_key(config_keys: &[String]) -> Option<String> {
    config_keys
        .iter()
        .find(|k| k.ends_with("_API_KEY") || k.ends_with("_BOT_TOKEN") || k.ends_with("_TOKEN"))
        .cloned()
}

/// `google-genai` becomes `Google Genai`.
pub fn format_plugin_name(id: &str) -> String {
    id.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "$schema": "plugin-index",
        "generatedAt": "2026-01-01T00:00:00Z",
        "count": 3,
        "plugins": [
            {
                "id": "openai",
                "name": "OpenAI",
                "description": "OpenAI models",
                "envKey": "OPENAI_API_KEY",
                "configKeys": ["OPENAI_API_KEY", "OPENAI_BASE_URL"],
                "pluginParameters": {
                    "OPENAI_API_KEY": {"type": "string", "required": true, "sensitive": true},
                    "OPENAI_BASE_URL": {"type": "string", "default": "https://api.openai.com/v1"}
                }
            },
            {
                "id": "telegram",
                "description": "Telegram bot",
                "configKeys": ["TELEGRAM_BOT_TOKEN"]
            },
            {
                "id": "openai",
                "name": "Duplicate",
                "configKeys": []
            }
        ]
    }"#;

    #[test]
    fn test_manifest_entries() {
        let entries = parse_manifest(MANIFEST).unwrap().into_entries();
        assert_eq!(entries.len(), 2);

        let openai = entries.iter().find(|e| e.id == "openai").unwrap();
        assert_eq!(openai.name, "OpenAI");
        assert_eq!(openai.category, PluginCategory::AiProvider);
        assert_eq!(openai.env_key.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(openai.parameters.len(), 2);
        let base_url = openai
            .parameters
            .iter()
            .find(|p| p.key == "OPENAI_BASE_URL")
            .unwrap();
        assert_eq!(base_url.default.as_deref(), Some("https://api.openai.com/v1"));

        let telegram = entries.iter().find(|e| e.id == "telegram").unwrap();
        assert_eq!(telegram.name, "Telegram");
        assert_eq!(telegram.category, PluginCategory::Connector);
        assert_eq!(telegram.env_key.as_deref(), Some("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_entries_sorted_by_name() {
        let entries = parse_manifest(MANIFEST).unwrap().into_entries();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["OpenAI", "Telegram"]);
    }

    #[test]
    fn test_categorize_plugin() {
        assert_eq!(categorize_plugin("anthropic"), PluginCategory::AiProvider);
        assert_eq!(categorize_plugin("discord"), PluginCategory::Connector);
        assert_eq!(categorize_plugin("sql"), PluginCategory::Database);
        assert_eq!(categorize_plugin("browser"), PluginCategory::Feature);
    }

    #[test]
    fn test_format_plugin_name() {
        assert_eq!(format_plugin_name("google-genai"), "Google Genai");
        assert_eq!(format_plugin_name("sql"), "Sql");
    }

    #[test]
    fn test_load_manifest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_manifest(&dir.path().join("plugins.json")).is_err());
    }
}
