use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::state_machine::{AgentStateMachine, LifecycleEvent, TransitionError};
use crate::logs::{LogBuffer, LogIngestor};
use crate::runtime::{autonomy_service, detect_model, AgentRuntime, RestartHandler};
use crate::state::{AgentStatus, ServerState};
use crate::types::{now_millis, AgentState, LogLevel};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("A restart is already in progress")]
    Conflict,

    #[error("Restart is not supported in this mode (no restart handler registered)")]
    Unsupported,

    #[error("Restart failed: {0}")]
    RestartFailed(String),

    #[error("Reset failed: {0}")]
    ResetFailed(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Drives the agent state machine and the runtime's autonomy loop.
///
/// Restarts are serialized by `restart_in_flight`; the `restarting` state is
/// only what callers observe.
#[derive(Clone)]
pub struct LifecycleController {
    state: Arc<RwLock<ServerState>>,
    restart_handler: Option<Arc<dyn RestartHandler>>,
    restart_in_flight: Arc<AtomicBool>,
    ingestor: Arc<LogIngestor>,
    default_agent_name: String,
    state_dir: PathBuf,
}

struct RestartGuard(Arc<AtomicBool>);

impl Drop for RestartGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum Autonomy {
    Enable,
    Disable,
}

impl LifecycleController {
    pub fn new(
        state: Arc<RwLock<ServerState>>,
        restart_handler: Option<Arc<dyn RestartHandler>>,
        ingestor: Arc<LogIngestor>,
        default_agent_name: String,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            state,
            restart_handler,
            restart_in_flight: Arc::new(AtomicBool::new(false)),
            ingestor,
            default_agent_name,
            state_dir,
        }
    }

    pub fn logs(&self) -> &Arc<LogBuffer> {
        self.ingestor.buffer()
    }

    pub async fn status(&self) -> AgentStatus {
        self.state.read().await.status()
    }

    pub async fn start(&self) -> Result<AgentStatus, LifecycleError> {
        let (status, runtime) = {
            let mut state = self.state.write().await;
            state.agent_state =
                AgentStateMachine::transition(state.agent_state, LifecycleEvent::Start)?;
            state.started_at = Some(now_millis());
            state.model = Some(
                state
                    .runtime
                    .as_deref()
                    .map(detect_model)
                    .unwrap_or_else(|| "unknown".to_string()),
            );
            (state.status(), state.runtime.clone())
        };

        self.set_autonomy(runtime, Autonomy::Enable).await;
        self.record(LogLevel::Info, "[lifecycle] Agent started");
        Ok(status)
    }

    pub async fn stop(&self) -> Result<AgentStatus, LifecycleError> {
        let (status, runtime) = {
            let mut state = self.state.write().await;
            state.agent_state =
                AgentStateMachine::transition(state.agent_state, LifecycleEvent::Stop)?;
            state.model = None;
            state.started_at = None;
            (state.status(), state.runtime.clone())
        };

        self.set_autonomy(runtime, Autonomy::Disable).await;
        self.record(LogLevel::Info, "[lifecycle] Agent stopped");
        Ok(status)
    }

    pub async fn pause(&self) -> Result<AgentStatus, LifecycleError> {
        let (status, runtime) = self.apply(LifecycleEvent::Pause).await?;
        self.set_autonomy(runtime, Autonomy::Disable).await;
        self.record(LogLevel::Info, "[lifecycle] Agent paused");
        Ok(status)
    }

    pub async fn resume(&self) -> Result<AgentStatus, LifecycleError> {
        let (status, runtime) = self.apply(LifecycleEvent::Resume).await?;
        self.set_autonomy(runtime, Autonomy::Enable).await;
        self.record(LogLevel::Info, "[lifecycle] Agent resumed");
        Ok(status)
    }

    /// Replace the runtime through the registered handler. The work runs on
    /// its own task, so dropping the caller's future does not abandon it.
    pub async fn restart(&self) -> Result<AgentStatus, LifecycleError> {
        let handler = self
            .restart_handler
            .clone()
            .ok_or(LifecycleError::Unsupported)?;

        if self.restart_in_flight.swap(true, Ordering::SeqCst) {
            return Err(LifecycleError::Conflict);
        }
        let guard = RestartGuard(self.restart_in_flight.clone());

        let previous = {
            let mut state = self.state.write().await;
            let previous = state.agent_state;
            state.agent_state =
                AgentStateMachine::transition(previous, LifecycleEvent::RestartBegun)
                    .map_err(|_| LifecycleError::Conflict)?;
            previous
        };
        self.record(LogLevel::Info, "[lifecycle] Restart requested");

        let controller = self.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            controller.run_restart(handler, previous).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                self.restore(previous).await;
                Err(LifecycleError::RestartFailed(e.to_string()))
            }
        }
    }

    async fn run_restart(
        &self,
        handler: Arc<dyn RestartHandler>,
        previous: AgentState,
    ) -> Result<AgentStatus, LifecycleError> {
        let message = match handler.restart().await {
            Ok(Some(runtime)) => {
                let status = self.adopt_runtime(runtime).await;
                self.record(LogLevel::Info, "[lifecycle] Restart complete");
                return Ok(status);
            }
            Ok(None) => "restart handler returned no runtime".to_string(),
            Err(e) => format!("{:#}", e),
        };

        self.restore(previous).await;
        self.record(LogLevel::Error, format!("[lifecycle] Restart failed: {}", message));
        Err(LifecycleError::RestartFailed(message))
    }

    async fn restore(&self, previous: AgentState) {
        let mut state = self.state.write().await;
        if let Ok(next) = AgentStateMachine::transition(
            state.agent_state,
            LifecycleEvent::RestartFailed { previous },
        ) {
            state.agent_state = next;
        }
    }

    /// Take over a runtime that was (re)created elsewhere and connect its
    /// logger. Attaching the same runtime twice is a no-op.
    pub async fn adopt_runtime(&self, runtime: Arc<dyn AgentRuntime>) -> AgentStatus {
        let status = {
            let mut state = self.state.write().await;
            let event = if state.agent_state == AgentState::Restarting {
                LifecycleEvent::RestartSucceeded
            } else {
                LifecycleEvent::Start
            };
            state.agent_state = AgentStateMachine::transition(state.agent_state, event)
                .unwrap_or(AgentState::Running);
            state.agent_name = runtime
                .agent_name()
                .unwrap_or_else(|| self.default_agent_name.clone());
            state.model = Some(detect_model(runtime.as_ref()));
            state.started_at = Some(now_millis());
            state.runtime = Some(runtime.clone());
            state.open_chat_session();
            state.status()
        };

        self.ingestor.attach(runtime.as_ref());
        status
    }

    /// Stop the runtime, wipe persisted agent data and return to
    /// `not_started`.
    pub async fn reset(&self) -> Result<AgentStatus, LifecycleError> {
        let controller = self.clone();
        tokio::spawn(async move { controller.run_reset().await })
            .await
            .map_err(|e| LifecycleError::ResetFailed(e.to_string()))?
    }

    async fn run_reset(&self) -> Result<AgentStatus, LifecycleError> {
        let runtime = self.state.read().await.runtime.clone();
        if let Some(runtime) = runtime {
            if let Err(e) = runtime.stop().await {
                self.record(
                    LogLevel::Warn,
                    format!("[lifecycle] Runtime stop failed during reset: {:#}", e),
                );
            }
        }

        if tokio::fs::try_exists(&self.state_dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&self.state_dir)
                .await
                .map_err(|e| {
                    LifecycleError::ResetFailed(format!("{}: {}", self.state_dir.display(), e))
                })?;
        }

        let status = {
            let mut state = self.state.write().await;
            state.agent_state =
                AgentStateMachine::transition(state.agent_state, LifecycleEvent::Reset)?;
            state.agent_name = self.default_agent_name.clone();
            state.model = None;
            state.started_at = None;
            state.runtime = None;
            state.chat_room_id = None;
            state.chat_user_id = None;
            state.status()
        };

        self.record(LogLevel::Warn, "[lifecycle] Agent reset; persisted state removed");
        Ok(status)
    }

    /// Mark the agent as failed. Only external supervisors call this.
    pub async fn report_fault(&self, message: &str) -> AgentStatus {
        let status = {
            let mut state = self.state.write().await;
            state.agent_state = AgentState::Error;
            state.status()
        };
        self.record(LogLevel::Error, format!("[lifecycle] Agent fault: {}", message));
        status
    }

    /// Whether the runtime's autonomy loop is running.
    pub async fn autonomy_running(&self) -> bool {
        let runtime = self.state.read().await.runtime.clone();
        runtime
            .as_deref()
            .and_then(autonomy_service)
            .map(|svc| svc.is_loop_running())
            .unwrap_or(false)
    }

    async fn apply(
        &self,
        event: LifecycleEvent,
    ) -> Result<(AgentStatus, Option<Arc<dyn AgentRuntime>>), LifecycleError> {
        let mut state = self.state.write().await;
        state.agent_state = AgentStateMachine::transition(state.agent_state, event)?;
        Ok((state.status(), state.runtime.clone()))
    }

    async fn set_autonomy(&self, runtime: Option<Arc<dyn AgentRuntime>>, action: Autonomy) {
        let Some(service) = runtime.as_deref().and_then(autonomy_service) else {
            return;
        };

        let result = match action {
            Autonomy::Enable => service.enable_autonomy().await,
            Autonomy::Disable => service.disable_autonomy().await,
        };
        if let Err(e) = result {
            self.record(
                LogLevel::Warn,
                format!("[lifecycle] Autonomy toggle failed: {:#}", e),
            );
        }
    }

    fn record(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        self.logs().system(level, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MemoryEnvironment;
    use crate::plugins::PluginRegistry;
    use crate::runtime::FnRestartHandler;
    use futures::FutureExt;

    fn controller(handler: Option<Arc<dyn RestartHandler>>) -> LifecycleController {
        let plugins = PluginRegistry::new(Vec::new(), Arc::new(MemoryEnvironment::new()));
        let state = Arc::new(RwLock::new(ServerState::new(
            "Steward".to_string(),
            None,
            plugins,
        )));
        let ingestor = Arc::new(LogIngestor::new(Arc::new(LogBuffer::new())));
        let dir = std::env::temp_dir().join(format!("steward-test-{}", uuid::Uuid::new_v4()));
        LifecycleController::new(state, handler, ingestor, "Steward".to_string(), dir)
    }

    #[tokio::test]
    async fn test_start_stop_without_runtime() {
        let controller = controller(None);

        let status = controller.start().await.unwrap();
        assert_eq!(status.state, AgentState::Running);
        assert_eq!(status.model.as_deref(), Some("unknown"));
        assert!(status.started_at.is_some());

        let status = controller.pause().await.unwrap();
        assert_eq!(status.state, AgentState::Paused);
        assert!(status.started_at.is_some());

        let status = controller.stop().await.unwrap();
        assert_eq!(status.state, AgentState::Stopped);
        assert!(status.model.is_none());
        assert!(status.started_at.is_none());
    }

    #[tokio::test]
    async fn test_restart_without_handler_is_unsupported() {
        let controller = controller(None);
        let result = controller.restart().await;
        assert!(matches!(result, Err(LifecycleError::Unsupported)));
        assert_eq!(controller.status().await.state, AgentState::NotStarted);
    }

    #[tokio::test]
    async fn test_failed_restart_restores_previous_state() {
        let handler = FnRestartHandler::new(|| async { Err(anyhow::anyhow!("boom")) }.boxed());
        let controller = controller(Some(Arc::new(handler)));
        controller.start().await.unwrap();

        let result = controller.restart().await;
        match result {
            Err(LifecycleError::RestartFailed(message)) => assert!(message.contains("boom")),
            other => panic!("unexpected result: {:?}", other.map(|s| s.state)),
        }
        assert_eq!(controller.status().await.state, AgentState::Running);
        assert!(!controller.restart_in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_restart_returning_nothing_fails() {
        let handler = FnRestartHandler::new(|| async { Ok(None) }.boxed());
        let controller = controller(Some(Arc::new(handler)));
        controller.pause().await.unwrap();

        let result = controller.restart().await;
        assert!(matches!(result, Err(LifecycleError::RestartFailed(_))));
        assert_eq!(controller.status().await.state, AgentState::Paused);
    }

    #[tokio::test]
    async fn test_reset_clears_identity_and_state_dir() {
        let controller = controller(None);
        tokio::fs::create_dir_all(controller.state_dir.join("memory"))
            .await
            .unwrap();
        controller.start().await.unwrap();
        controller.state.write().await.open_chat_session();

        let status = controller.reset().await.unwrap();
        assert_eq!(status.state, AgentState::NotStarted);
        assert_eq!(status.agent_name, "Steward");
        assert!(status.model.is_none());
        assert!(!controller.state_dir.exists());

        let state = controller.state.read().await;
        assert!(state.chat_room_id.is_none());
        assert!(state.chat_user_id.is_none());
    }

    #[tokio::test]
    async fn test_report_fault_sets_error() {
        let controller = controller(None);
        let status = controller.report_fault("runtime crashed").await;
        assert_eq!(status.state, AgentState::Error);

        let status = controller.start().await.unwrap();
        assert_eq!(status.state, AgentState::Running);
    }

    #[tokio::test]
    async fn test_lifecycle_events_reach_log_buffer() {
        let controller = controller(None);
        controller.start().await.unwrap();

        let entries = controller.logs().snapshot();
        assert!(entries
            .iter()
            .any(|e| e.source == "lifecycle" && e.message.contains("started")));
    }
}
