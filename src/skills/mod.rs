pub mod discovery;
pub mod preferences;
pub mod resolution;

pub use discovery::{parse_skill_descriptor, SkillDiscovery, SKILL_DESCRIPTOR};
pub use preferences::{RuntimeSkillPreferences, SkillPreferenceStore, SKILL_PREFS_CACHE_KEY};
pub use resolution::{explain_skill_enabled, resolve_skill_enabled, Resolution, PRECEDENCE};
