pub mod log;
pub mod plugin;
pub mod skill;

pub use log::{LogEntry, LogLevel};
pub use plugin::{PluginCategory, PluginEntry, PluginParamDef, ValidationIssue};
pub use skill::{SkillEntry, SkillPreferencesMap};

use serde::{Deserialize, Serialize};

/// Observable lifecycle of the agent behind the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    NotStarted, // No runtime has been started yet
    Running,    // Runtime up, autonomy loop enabled
    Paused,     // Runtime up, autonomy loop disabled
    Stopped,    // Stopped by the operator
    Restarting, // External restart handler in flight
    Error,      // Set only by an external fault report
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::NotStarted => "not_started",
            AgentState::Running => "running",
            AgentState::Paused => "paused",
            AgentState::Stopped => "stopped",
            AgentState::Restarting => "restarting",
            AgentState::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since the Unix epoch, the unit every timestamp on the wire uses.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
