//! Access to the live configuration environment.
//!
//! Plugin parameters are never stored by the control plane; they are read
//! from (and written to) an [`Environment`] at request time.

use std::collections::HashMap;
use std::sync::RwLock;

pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);

    /// Value for `key` when it holds something other than whitespace.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

/// An isolated environment, used when embedding the control plane or in tests.
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: RwLock::new(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl Environment for MemoryEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        let vars = self.vars.read().unwrap_or_else(|e| e.into_inner());
        vars.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut vars = self.vars.write().unwrap_or_else(|e| e.into_inner());
        vars.insert(key.to_string(), value.to_string());
    }
}
