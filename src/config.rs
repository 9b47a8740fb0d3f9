use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 2138;
pub const DEFAULT_AGENT_NAME: &str = "Steward";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported config format: {0} (expected .toml, .yaml or .yml)")]
    UnknownFormat(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub state_dir: PathBuf,
    pub plugins: PluginsConfig,
    pub skills: SkillsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub manifest: PathBuf,
}

/// Declarative skill settings. Persisted per-agent preferences outrank all
/// of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkillsConfig {
    /// When non-empty, only these skills are enabled by default.
    pub allow_bundled: Vec<String>,
    /// Always disabled unless the operator explicitly re-enabled them.
    pub deny_bundled: Vec<String>,
    pub entries: BTreeMap<String, SkillEntryConfig>,
    pub load: SkillLoadConfig,
    /// Directory of skills shipped with the runtime.
    pub bundled_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntryConfig {
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkillLoadConfig {
    pub extra_dirs: Vec<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.to_string(),
            workspace: None,
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("plugins.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            agent: AgentConfig::default(),
            state_dir: default_state_dir(),
            plugins: PluginsConfig::default(),
            skills: SkillsConfig::default(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".steward"))
        .unwrap_or_else(|| PathBuf::from(".steward"))
}

impl Config {
    /// Parse a config file, choosing TOML or YAML by extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            }),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })
            }
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }

    /// Load the config the server starts with. A broken or missing file is
    /// logged and replaced by defaults; environment overrides always apply.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = match path {
            Some(path) => Self::from_file(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config, starting with defaults: {}", e);
                Self::default()
            }),
            None => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = var("STEWARD_API_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = var("STEWARD_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid STEWARD_PORT: {}", port),
            }
        }
        if let Some(dir) = var("STEWARD_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(manifest) = var("STEWARD_PLUGIN_MANIFEST") {
            self.plugins.manifest = PathBuf::from(manifest);
        }
        if let Some(dir) = var("STEWARD_SKILLS_DIR") {
            self.skills.bundled_dir = Some(PathBuf::from(dir));
        }
        if let Some(name) = var("STEWARD_AGENT_NAME") {
            self.agent.name = name;
        }
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.agent
            .workspace
            .clone()
            .unwrap_or_else(|| self.state_dir.join("workspace"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.agent.name, DEFAULT_AGENT_NAME);
        assert_eq!(config.workspace_dir(), config.state_dir.join("workspace"));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steward.toml");
        std::fs::write(
            &path,
            r#"
stateDir = "/var/lib/steward"

[server]
port = 9000

[agent]
name = "Ada"

[skills]
allowBundled = ["weather"]
denyBundled = ["shell"]

[skills.entries.github]
enabled = false

[skills.load]
extraDirs = ["/opt/skills"]
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.agent.name, "Ada");
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/steward"));
        assert_eq!(config.skills.allow_bundled, vec!["weather"]);
        assert_eq!(config.skills.deny_bundled, vec!["shell"]);
        assert_eq!(config.skills.entries["github"].enabled, Some(false));
        assert_eq!(config.skills.load.extra_dirs, vec![PathBuf::from("/opt/skills")]);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steward.yaml");
        std::fs::write(
            &path,
            "agent:\n  name: Grace\nskills:\n  denyBundled:\n    - shell\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.agent.name, "Grace");
        assert_eq!(config.skills.deny_bundled, vec!["shell"]);
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steward.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "server = [").unwrap();

        let config = Config::load(Some(&path));
        assert_eq!(config.skills, SkillsConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STEWARD_PORT", "8080"),
            ("STEWARD_AGENT_NAME", "Lin"),
            ("STEWARD_STATE_DIR", "/tmp/steward"),
        ]);
        let mut config = Config::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.agent.name, "Lin");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/steward"));
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(|k| (k == "STEWARD_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, DEFAULT_PORT);
    }
}
