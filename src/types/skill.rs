use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-agent map of skill id to the enabled flag the operator last chose.
pub type SkillPreferencesMap = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
}
