//! Effective enabled state of a skill.
//!
//! The precedence chain is a table of rules evaluated top-down; the first
//! rule that returns an outcome decides.

use serde::Serialize;

use crate::config::SkillsConfig;
use crate::types::SkillPreferencesMap;

pub struct SkillQuery<'a> {
    pub id: &'a str,
    pub config: &'a SkillsConfig,
    pub prefs: &'a SkillPreferencesMap,
}

pub struct PrecedenceRule {
    pub name: &'static str,
    pub decide: fn(&SkillQuery<'_>) -> Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub enabled: bool,
    pub rule: &'static str,
}

pub const PRECEDENCE: &[PrecedenceRule] = &[
    PrecedenceRule {
        name: "persisted-preference",
        decide: persisted_preference,
    },
    PrecedenceRule {
        name: "deny-list",
        decide: deny_list,
    },
    PrecedenceRule {
        name: "entry-override",
        decide: entry_override,
    },
    PrecedenceRule {
        name: "allow-list",
        decide: allow_list,
    },
    PrecedenceRule {
        name: "default",
        decide: enabled_by_default,
    },
];

fn persisted_preference(q: &SkillQuery<'_>) -> Option<bool> {
    q.prefs.get(q.id).copied()
}

fn deny_list(q: &SkillQuery<'_>) -> Option<bool> {
    q.config
        .deny_bundled
        .iter()
        .any(|id| id == q.id)
        .then_some(false)
}

fn entry_override(q: &SkillQuery<'_>) -> Option<bool> {
    q.config.entries.get(q.id).and_then(|entry| entry.enabled)
}

// Allow-list mode is a strict whitelist: absence disables.
fn allow_list(q: &SkillQuery<'_>) -> Option<bool> {
    if q.config.allow_bundled.is_empty() {
        return None;
    }
    Some(q.config.allow_bundled.iter().any(|id| id == q.id))
}

fn enabled_by_default(_: &SkillQuery<'_>) -> Option<bool> {
    Some(true)
}

pub fn explain_skill_enabled(
    id: &str,
    config: &SkillsConfig,
    prefs: &SkillPreferencesMap,
) -> Resolution {
    let query = SkillQuery { id, config, prefs };
    PRECEDENCE
        .iter()
        .find_map(|rule| {
            (rule.decide)(&query).map(|enabled| Resolution {
                enabled,
                rule: rule.name,
            })
        })
        .unwrap_or(Resolution {
            enabled: true,
            rule: "default",
        })
}

pub fn resolve_skill_enabled(id: &str, config: &SkillsConfig, prefs: &SkillPreferencesMap) -> bool {
    explain_skill_enabled(id, config, prefs).enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkillEntryConfig;

    fn prefs(pairs: &[(&str, bool)]) -> SkillPreferencesMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_persisted_preference_beats_entry_enable() {
        let mut config = SkillsConfig::default();
        config.entries.insert(
            "s".to_string(),
            SkillEntryConfig {
                enabled: Some(true),
            },
        );

        let resolution = explain_skill_enabled("s", &config, &prefs(&[("s", false)]));
        assert!(!resolution.enabled);
        assert_eq!(resolution.rule, "persisted-preference");
    }

    #[test]
    fn test_persisted_preference_beats_deny_list() {
        let config = SkillsConfig {
            deny_bundled: strings(&["s"]),
            ..Default::default()
        };
        assert!(resolve_skill_enabled("s", &config, &prefs(&[("s", true)])));
    }

    #[test]
    fn test_deny_list_beats_allow_list() {
        let config = SkillsConfig {
            deny_bundled: strings(&["s"]),
            allow_bundled: strings(&["s"]),
            ..Default::default()
        };
        let resolution = explain_skill_enabled("s", &config, &prefs(&[]));
        assert!(!resolution.enabled);
        assert_eq!(resolution.rule, "deny-list");
    }

    #[test]
    fn test_deny_list_beats_entry_enable() {
        let mut config = SkillsConfig {
            deny_bundled: strings(&["s"]),
            ..Default::default()
        };
        config.entries.insert(
            "s".to_string(),
            SkillEntryConfig {
                enabled: Some(true),
            },
        );
        assert!(!resolve_skill_enabled("s", &config, &prefs(&[])));
    }

    #[test]
    fn test_entry_override_beats_allow_list() {
        let mut config = SkillsConfig {
            allow_bundled: strings(&["a"]),
            ..Default::default()
        };
        config.entries.insert(
            "b".to_string(),
            SkillEntryConfig {
                enabled: Some(true),
            },
        );
        let resolution = explain_skill_enabled("b", &config, &prefs(&[]));
        assert!(resolution.enabled);
        assert_eq!(resolution.rule, "entry-override");
    }

    #[test]
    fn test_entry_without_flag_falls_through() {
        let mut config = SkillsConfig::default();
        config
            .entries
            .insert("s".to_string(), SkillEntryConfig { enabled: None });
        let resolution = explain_skill_enabled("s", &config, &prefs(&[]));
        assert_eq!(resolution.rule, "default");
    }

    #[test]
    fn test_allow_list_is_strict_whitelist() {
        let config = SkillsConfig {
            allow_bundled: strings(&["a"]),
            ..Default::default()
        };
        assert!(resolve_skill_enabled("a", &config, &prefs(&[])));
        assert!(!resolve_skill_enabled("b", &config, &prefs(&[])));
    }

    #[test]
    fn test_default_is_enabled() {
        let resolution = explain_skill_enabled("anything", &SkillsConfig::default(), &prefs(&[]));
        assert!(resolution.enabled);
        assert_eq!(resolution.rule, "default");
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<&str> = PRECEDENCE.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "persisted-preference",
                "deny-list",
                "entry-override",
                "allow-list",
                "default"
            ]
        );
    }
}
