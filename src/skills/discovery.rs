//! Skill discovery.
//!
//! Skills come from the runtime's skills service when it reports any;
//! otherwise skill directories (those containing a `SKILL.md`) are scanned
//! from the bundled directory, the workspace `skills/` directory and any
//! configured extra directories, in that order.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use walkdir::WalkDir;

use super::preferences::{RuntimeSkillPreferences, SkillPreferenceStore};
use super::resolution::resolve_skill_enabled;
use crate::config::SkillsConfig;
use crate::runtime::{skills_service, AgentRuntime};
use crate::types::{SkillEntry, SkillPreferencesMap};

pub const SKILL_DESCRIPTOR: &str = "SKILL.md";
pub const MAX_DESCRIPTION_CHARS: usize = 200;

const SKIPPED_DIRS: &[&str] = &["node_modules", "src", "dist"];

pub struct SkillDiscovery {
    config: SkillsConfig,
}

impl SkillDiscovery {
    pub fn new(config: SkillsConfig) -> Self {
        Self { config }
    }

    /// Discover skills with their effective enabled state. Only a failure of
    /// the scan task itself is an error; unreadable sources are skipped.
    pub async fn discover(
        &self,
        workspace_dir: &Path,
        runtime: Option<&Arc<dyn AgentRuntime>>,
    ) -> Result<Vec<SkillEntry>> {
        let prefs = RuntimeSkillPreferences::new(runtime.cloned()).load().await;

        if let Some(runtime) = runtime {
            if let Some(skills) = self.from_runtime(runtime.as_ref(), &prefs) {
                return Ok(skills);
            }
        }

        let roots = self.candidate_roots(workspace_dir);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || scan_roots(&roots, &config, &prefs))
            .await
            .context("skill scan task failed")
    }

    fn from_runtime(
        &self,
        runtime: &dyn AgentRuntime,
        prefs: &SkillPreferencesMap,
    ) -> Option<Vec<SkillEntry>> {
        let service = skills_service(runtime)?;
        let loaded = match service.loaded_skills() {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::debug!("Skills service unavailable, scanning filesystem: {:#}", e);
                return None;
            }
        };
        if loaded.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let mut skills: Vec<SkillEntry> = loaded
            .into_iter()
            .filter(|s| seen.insert(s.slug.clone()))
            .map(|s| SkillEntry {
                enabled: resolve_skill_enabled(&s.slug, &self.config, prefs),
                name: if s.name.is_empty() {
                    s.slug.clone()
                } else {
                    s.name
                },
                description: truncate_description(&s.description),
                id: s.slug,
            })
            .collect();

        sort_by_name(&mut skills);
        Some(skills)
    }

    /// Existing scan roots in precedence order.
    pub fn candidate_roots(&self, workspace_dir: &Path) -> Vec<PathBuf> {
        self.config
            .bundled_dir
            .iter()
            .cloned()
            .chain(std::iter::once(workspace_dir.join("skills")))
            .chain(self.config.load.extra_dirs.iter().cloned())
            .filter(|dir| dir.is_dir())
            .collect()
    }

    /// Filesystem discovery over explicit roots.
    pub fn scan(&self, roots: &[PathBuf], prefs: &SkillPreferencesMap) -> Vec<SkillEntry> {
        scan_roots(roots, &self.config, prefs)
    }
}

// Ids are directory names and the first one found wins across all roots,
// so a later root can never shadow an earlier one.
fn scan_roots(
    roots: &[PathBuf],
    config: &SkillsConfig,
    prefs: &SkillPreferencesMap,
) -> Vec<SkillEntry> {
    let mut seen = HashSet::new();
    let mut skills = Vec::new();

    for root in roots {
        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable skill path: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let dir_name = entry.file_name().to_string_lossy().to_string();
            if dir_name.starts_with('.') || SKIPPED_DIRS.contains(&dir_name.as_str()) {
                walker.skip_current_dir();
                continue;
            }

            let descriptor = entry.path().join(SKILL_DESCRIPTOR);
            if !descriptor.is_file() {
                // Nested skill group.
                continue;
            }
            walker.skip_current_dir();

            if !seen.insert(dir_name.clone()) {
                tracing::debug!(
                    skill = %dir_name,
                    path = %entry.path().display(),
                    "Skipping duplicate skill id"
                );
                continue;
            }

            let content = match std::fs::read_to_string(&descriptor) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!("Skipping unreadable {}: {}", descriptor.display(), e);
                    continue;
                }
            };

            let (name, description) = parse_skill_descriptor(&dir_name, &content);
            skills.push(SkillEntry {
                enabled: resolve_skill_enabled(&dir_name, config, prefs),
                id: dir_name,
                name,
                description,
            });
        }
    }

    sort_by_name(&mut skills);
    skills
}

fn sort_by_name(skills: &mut [SkillEntry]) {
    skills.sort_by_cached_key(|s| s.name.to_lowercase());
}

fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

fn front_matter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^---[ \t]*\r?\n((?s:.*?))\r?\n---").expect("front matter regex is valid")
    })
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^name:[ \t]*(.+)$").expect("name regex is valid"))
}

fn description_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^description:[ \t]*(.+)$").expect("description regex is valid")
    })
}

fn front_matter_field(block: &str, re: &Regex) -> Option<String> {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| strip_quotes(m.as_str().trim()).to_string())
        .filter(|v| !v.is_empty())
}

fn strip_quotes(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}

/// Name and description of a skill from its `SKILL.md`. Front matter wins;
/// without a description there, the body's first heading and first prose
/// line are used. `id` is the fallback name.
pub fn parse_skill_descriptor(id: &str, content: &str) -> (String, String) {
    let mut name: Option<String> = None;
    let mut description = String::new();
    let mut body = content;

    if let Some(caps) = front_matter_regex().captures(content) {
        let block = caps.get(1).map_or("", |m| m.as_str());
        name = front_matter_field(block, name_regex());
        description = front_matter_field(block, description_regex()).unwrap_or_default();
        body = caps.get(0).map_or(content, |m| &content[m.end()..]);
    }

    if description.is_empty() {
        let mut lines = body.lines().map(str::trim);
        if name.is_none() {
            name = body
                .lines()
                .map(str::trim)
                .find(|l| l.starts_with('#'))
                .map(|l| l.trim_start_matches('#').trim().to_string())
                .filter(|l| !l.is_empty());
        }
        description = lines
            .find(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("---"))
            .unwrap_or_default()
            .to_string();
    }

    (
        name.unwrap_or_else(|| id.to_string()),
        truncate_description(&description),
    )
}
