//! Interfaces of the external agent runtime the control plane fronts.
//!
//! The runtime itself (message handling, memory, inference) lives elsewhere;
//! these traits describe only what the control plane calls.

pub mod restart;

pub use restart::{FnRestartHandler, RestartHandler};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::logs::LogSink;

pub const AUTONOMY_SERVICE: &str = "AUTONOMY";
pub const SKILLS_SERVICE: &str = "AGENT_SKILLS_SERVICE";

#[derive(Clone)]
pub enum RuntimeService {
    Autonomy(Arc<dyn AutonomyService>),
    Skills(Arc<dyn SkillsService>),
}

/// The runtime's self-directed task loop.
#[async_trait]
pub trait AutonomyService: Send + Sync {
    async fn enable_autonomy(&self) -> Result<()>;
    async fn disable_autonomy(&self) -> Result<()>;
    fn is_loop_running(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedSkill {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
}

/// Skills the runtime has already loaded and validated.
pub trait SkillsService: Send + Sync {
    fn loaded_skills(&self) -> Result<Vec<LoadedSkill>>;
}

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Stable for the lifetime of one runtime instance.
    fn instance_id(&self) -> Uuid;
    fn agent_name(&self) -> Option<String>;
    fn loaded_plugins(&self) -> Vec<String>;
    fn service(&self, name: &str) -> Option<RuntimeService>;

    /// Per-agent keyed cache.
    async fn get_cache(&self, key: &str) -> Result<Option<Value>>;
    async fn set_cache(&self, key: &str, value: Value) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Route the runtime's log calls into `sink`.
    fn attach_log_sink(&self, sink: Arc<dyn LogSink>);
}

pub fn autonomy_service(runtime: &dyn AgentRuntime) -> Option<Arc<dyn AutonomyService>> {
    match runtime.service(AUTONOMY_SERVICE)? {
        RuntimeService::Autonomy(svc) => Some(svc),
        _ => None,
    }
}

pub fn skills_service(runtime: &dyn AgentRuntime) -> Option<Arc<dyn SkillsService>> {
    match runtime.service(SKILLS_SERVICE)? {
        RuntimeService::Skills(svc) => Some(svc),
        _ => None,
    }
}

/// Model label for the status view: the first loaded provider plugin.
pub fn detect_model(runtime: &dyn AgentRuntime) -> String {
    runtime
        .loaded_plugins()
        .into_iter()
        .find(|name| {
            name.contains("anthropic") || name.contains("openai") || name.contains("groq")
        })
        .unwrap_or_else(|| "unknown".to_string())
}
