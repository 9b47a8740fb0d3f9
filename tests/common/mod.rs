//! Mock agent runtime shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use steward::logs::{LogCall, LogSink};
use steward::runtime::{
    AgentRuntime, AutonomyService, LoadedSkill, RuntimeService, SkillsService, AUTONOMY_SERVICE,
    SKILLS_SERVICE,
};

#[derive(Default)]
pub struct MockAutonomy {
    pub running: AtomicBool,
    pub fail: AtomicBool,
}

#[async_trait]
impl AutonomyService for MockAutonomy {
    async fn enable_autonomy(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("autonomy loop unavailable"));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disable_autonomy(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_loop_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct MockSkills {
    pub skills: Mutex<Result<Vec<LoadedSkill>, String>>,
}

impl MockSkills {
    pub fn with(skills: Vec<LoadedSkill>) -> Self {
        Self {
            skills: Mutex::new(Ok(skills)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            skills: Mutex::new(Err(message.to_string())),
        }
    }
}

impl SkillsService for MockSkills {
    fn loaded_skills(&self) -> Result<Vec<LoadedSkill>> {
        self.skills.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}

pub fn loaded_skill(slug: &str, name: &str, description: &str) -> LoadedSkill {
    LoadedSkill {
        slug: slug.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        source: "bundled".to_string(),
    }
}

pub struct MockRuntime {
    pub id: Uuid,
    pub name: String,
    pub plugins: Vec<String>,
    pub autonomy: Arc<MockAutonomy>,
    pub skills: Option<Arc<MockSkills>>,
    pub cache: Mutex<HashMap<String, Value>>,
    pub fail_cache: AtomicBool,
    pub sinks: Mutex<Vec<Arc<dyn LogSink>>>,
    pub stop_calls: AtomicUsize,
}

impl MockRuntime {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            plugins: Vec::new(),
            autonomy: Arc::new(MockAutonomy::default()),
            skills: None,
            cache: Mutex::new(HashMap::new()),
            fail_cache: AtomicBool::new(false),
            sinks: Mutex::new(Vec::new()),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_plugins(mut self, plugins: &[&str]) -> Self {
        self.plugins = plugins.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_skills(mut self, skills: MockSkills) -> Self {
        self.skills = Some(Arc::new(skills));
        self
    }

    /// Emit a log call through every attached sink.
    pub fn emit(&self, call: LogCall) {
        for sink in self.sinks.lock().unwrap().iter() {
            sink.log(call.clone());
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    fn instance_id(&self) -> Uuid {
        self.id
    }

    fn agent_name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn loaded_plugins(&self) -> Vec<String> {
        self.plugins.clone()
    }

    fn service(&self, name: &str) -> Option<RuntimeService> {
        match name {
            AUTONOMY_SERVICE => Some(RuntimeService::Autonomy(self.autonomy.clone())),
            SKILLS_SERVICE => self
                .skills
                .clone()
                .map(|s| RuntimeService::Skills(s as Arc<dyn SkillsService>)),
            _ => None,
        }
    }

    async fn get_cache(&self, key: &str) -> Result<Option<Value>> {
        if self.fail_cache.load(Ordering::SeqCst) {
            return Err(anyhow!("cache offline"));
        }
        Ok(self.cache.lock().unwrap().get(key).cloned())
    }

    async fn set_cache(&self, key: &str, value: Value) -> Result<()> {
        if self.fail_cache.load(Ordering::SeqCst) {
            return Err(anyhow!("cache offline"));
        }
        self.cache.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn attach_log_sink(&self, sink: Arc<dyn LogSink>) {
        self.sinks.lock().unwrap().push(sink);
    }
}
