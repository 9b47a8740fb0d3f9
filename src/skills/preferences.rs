//! Persisted per-agent skill toggles.
//!
//! Stored as one map under a single cache key in the runtime's keyed cache.
//! Every failure degrades to "no preference"; nothing here returns errors.

use async_trait::async_trait;
use std::sync::Arc;

use crate::runtime::AgentRuntime;
use crate::types::SkillPreferencesMap;

pub const SKILL_PREFS_CACHE_KEY: &str = "steward:skill-preferences";

#[async_trait]
pub trait SkillPreferenceStore: Send + Sync {
    async fn load(&self) -> SkillPreferencesMap;
    async fn save(&self, prefs: &SkillPreferencesMap);

    /// Record one explicit toggle. Last write wins.
    async fn set(&self, id: &str, enabled: bool) {
        let mut prefs = self.load().await;
        prefs.insert(id.to_string(), enabled);
        self.save(&prefs).await;
    }
}

/// Preferences kept in the runtime's cache. Without a runtime, loads are
/// empty and saves are dropped.
pub struct RuntimeSkillPreferences {
    runtime: Option<Arc<dyn AgentRuntime>>,
}

impl RuntimeSkillPreferences {
    pub fn new(runtime: Option<Arc<dyn AgentRuntime>>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl SkillPreferenceStore for RuntimeSkillPreferences {
    async fn load(&self) -> SkillPreferencesMap {
        let Some(runtime) = &self.runtime else {
            return SkillPreferencesMap::new();
        };

        match runtime.get_cache(SKILL_PREFS_CACHE_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::debug!("Ignoring malformed skill preferences: {}", e);
                SkillPreferencesMap::new()
            }),
            Ok(None) => SkillPreferencesMap::new(),
            Err(e) => {
                tracing::debug!("Failed to load skill preferences: {:#}", e);
                SkillPreferencesMap::new()
            }
        }
    }

    async fn save(&self, prefs: &SkillPreferencesMap) {
        let Some(runtime) = &self.runtime else {
            return;
        };

        let value = match serde_json::to_value(prefs) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Failed to encode skill preferences: {}", e);
                return;
            }
        };

        if let Err(e) = runtime.set_cache(SKILL_PREFS_CACHE_KEY, value).await {
            tracing::debug!("Failed to save skill preferences: {:#}", e);
        }
    }
}
