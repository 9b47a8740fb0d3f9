//! Process logging setup.
//!
//! `RUST_LOG` wins over `STEWARD_LOG_LEVEL`; `STEWARD_LOG_JSON=1` switches
//! to JSON lines.

use tracing_subscriber::{prelude::*, EnvFilter};

pub const DEFAULT_LOG_LEVEL: &str = "steward=info,tower_http=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let level = var("STEWARD_LOG_LEVEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let json = var("STEWARD_LOG_JSON")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self { level, json }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let settings = LogSettings::from_env();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let _ = if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
}
