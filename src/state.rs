//! Shared control-plane state.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::plugins::PluginRegistry;
use crate::runtime::AgentRuntime;
use crate::types::{now_millis, AgentState, SkillEntry};

pub struct ServerState {
    pub agent_state: AgentState,
    pub agent_name: String,
    pub model: Option<String>,
    pub started_at: Option<i64>,
    pub runtime: Option<Arc<dyn AgentRuntime>>,
    pub plugins: PluginRegistry,
    pub skills: Vec<SkillEntry>,
    /// Chat session the control plane talks to the runtime through.
    pub chat_room_id: Option<Uuid>,
    pub chat_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub state: AgentState,
    pub agent_name: String,
    pub model: Option<String>,
    /// Milliseconds since `started_at`.
    pub uptime: Option<i64>,
    pub started_at: Option<i64>,
}

impl ServerState {
    /// A runtime handed in at startup counts as already running.
    pub fn new(
        agent_name: String,
        runtime: Option<Arc<dyn AgentRuntime>>,
        plugins: PluginRegistry,
    ) -> Self {
        let running = runtime.is_some();
        let mut state = Self {
            agent_state: if running {
                AgentState::Running
            } else {
                AgentState::NotStarted
            },
            agent_name: runtime
                .as_ref()
                .and_then(|r| r.agent_name())
                .unwrap_or(agent_name),
            model: running.then(|| "provided".to_string()),
            started_at: running.then(now_millis),
            runtime,
            plugins,
            skills: Vec::new(),
            chat_room_id: None,
            chat_user_id: None,
        };
        if running {
            state.open_chat_session();
        }
        state
    }

    /// Start a fresh chat session for the current runtime.
    pub fn open_chat_session(&mut self) {
        self.chat_room_id = Some(Uuid::new_v4());
        self.chat_user_id = Some(Uuid::new_v4());
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            state: self.agent_state,
            agent_name: self.agent_name.clone(),
            model: self.model.clone(),
            uptime: self.started_at.map(|t| (now_millis() - t).max(0)),
            started_at: self.started_at,
        }
    }

    pub fn loaded_plugins(&self) -> Option<Vec<String>> {
        self.runtime.as_ref().map(|r| r.loaded_plugins())
    }
}
