use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::config::Config;
use crate::environment::{Environment, ProcessEnvironment};
use crate::lifecycle::LifecycleController;
use crate::logs::{LogBuffer, LogIngestor};
use crate::plugins::PluginRegistry;
use crate::runtime::{AgentRuntime, RestartHandler};
use crate::skills::SkillDiscovery;
use crate::state::ServerState;
use crate::types::{LogLevel, SkillEntry};

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<RwLock<ServerState>>,
    pub lifecycle: LifecycleController,
    pub ingestor: Arc<LogIngestor>,
    pub discovery: Arc<SkillDiscovery>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn builder(config: Config) -> AppStateBuilder {
        AppStateBuilder {
            config,
            env: Arc::new(ProcessEnvironment),
            runtime: None,
            restart_handler: None,
            plugins: None,
        }
    }

    pub fn logs(&self) -> &Arc<LogBuffer> {
        self.ingestor.buffer()
    }

    /// Re-run skill discovery and replace the stored list.
    pub async fn refresh_skills(&self) -> Result<Vec<SkillEntry>> {
        let runtime = self.server.read().await.runtime.clone();
        let skills = self
            .discovery
            .discover(&self.config.workspace_dir(), runtime.as_ref())
            .await?;

        self.server.write().await.skills = skills.clone();
        self.logs().system(
            LogLevel::Info,
            format!("[skills] Discovered {} skills", skills.len()),
        );
        Ok(skills)
    }
}

pub struct AppStateBuilder {
    config: Config,
    env: Arc<dyn Environment>,
    runtime: Option<Arc<dyn AgentRuntime>>,
    restart_handler: Option<Arc<dyn RestartHandler>>,
    plugins: Option<PluginRegistry>,
}

impl AppStateBuilder {
    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn AgentRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn restart_handler(mut self, handler: Arc<dyn RestartHandler>) -> Self {
        self.restart_handler = Some(handler);
        self
    }

    /// Use a prepared catalog instead of reading the configured manifest.
    pub fn plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub async fn build(self) -> AppState {
        let config = Arc::new(self.config);
        let plugins = self.plugins.unwrap_or_else(|| {
            PluginRegistry::from_manifest(&config.plugins.manifest, self.env.clone())
        });
        let plugin_count = plugins.len();

        let ingestor = Arc::new(LogIngestor::new(Arc::new(LogBuffer::new())));
        if let Some(runtime) = &self.runtime {
            ingestor.attach(runtime.as_ref());
        }

        let server = Arc::new(RwLock::new(ServerState::new(
            config.agent.name.clone(),
            self.runtime,
            plugins,
        )));
        let lifecycle = LifecycleController::new(
            server.clone(),
            self.restart_handler,
            ingestor.clone(),
            config.agent.name.clone(),
            config.state_dir.clone(),
        );

        let app = AppState {
            server,
            lifecycle,
            ingestor,
            discovery: Arc::new(SkillDiscovery::new(config.skills.clone())),
            config,
        };

        let skill_count = match app.refresh_skills().await {
            Ok(skills) => skills.len(),
            Err(e) => {
                tracing::warn!("Initial skill discovery failed: {:#}", e);
                0
            }
        };

        let message = format!("Discovered {} plugins, {} skills", plugin_count, skill_count);
        tracing::info!("{}", message);
        app.logs().system(LogLevel::Info, message);
        app
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/config", get(handlers::get_config))
        .route("/api/status", get(handlers::get_status))
        .route("/api/agent/start", post(handlers::start_agent))
        .route("/api/agent/stop", post(handlers::stop_agent))
        .route("/api/agent/pause", post(handlers::pause_agent))
        .route("/api/agent/resume", post(handlers::resume_agent))
        .route("/api/agent/restart", post(handlers::restart_agent))
        .route("/api/agent/reset", post(handlers::reset_agent))
        .route("/api/agent/autonomy", get(handlers::get_autonomy))
        .route("/api/plugins", get(handlers::list_plugins))
        .route("/api/plugins/:id", put(handlers::update_plugin))
        .route("/api/skills", get(handlers::list_skills))
        .route("/api/skills/refresh", post(handlers::refresh_skills))
        .route("/api/skills/:id", put(handlers::update_skill))
        .route("/api/logs", get(handlers::get_logs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.bind, state.config.server.port);
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Steward control plane listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
