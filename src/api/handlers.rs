use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::server::AppState;
use crate::logs::{LogQuery, LogQueryResult};
use crate::plugins::PluginUpdate;
use crate::skills::{RuntimeSkillPreferences, SkillPreferenceStore};
use crate::state::AgentStatus;
use crate::types::LogLevel;

#[derive(Debug, Deserialize)]
pub struct SkillUpdate {
    pub enabled: bool,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_config(State(app): State<AppState>) -> Json<Value> {
    Json(serde_json::to_value(app.config.as_ref()).unwrap_or(Value::Null))
}

pub async fn get_status(State(app): State<AppState>) -> Json<AgentStatus> {
    Json(app.lifecycle.status().await)
}

fn lifecycle_response(status: AgentStatus) -> Json<Value> {
    Json(json!({ "ok": true, "status": status }))
}

pub async fn start_agent(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(lifecycle_response(app.lifecycle.start().await?))
}

pub async fn stop_agent(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(lifecycle_response(app.lifecycle.stop().await?))
}

pub async fn pause_agent(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(lifecycle_response(app.lifecycle.pause().await?))
}

pub async fn resume_agent(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(lifecycle_response(app.lifecycle.resume().await?))
}

pub async fn restart_agent(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(lifecycle_response(app.lifecycle.restart().await?))
}

pub async fn reset_agent(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(lifecycle_response(app.lifecycle.reset().await?))
}

pub async fn get_autonomy(State(app): State<AppState>) -> Json<Value> {
    Json(json!({ "enabled": app.lifecycle.autonomy_running().await }))
}

pub async fn list_plugins(State(app): State<AppState>) -> Json<Value> {
    let mut state = app.server.write().await;
    let loaded = state.loaded_plugins();
    let plugins = state.plugins.list(loaded.as_deref());
    Json(json!({ "plugins": plugins }))
}

pub async fn update_plugin(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PluginUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = body?;
    let plugin = app.server.write().await.plugins.update(&id, update)?;
    app.logs().system(
        LogLevel::Info,
        format!("[plugins] Updated {}", plugin.id),
    );
    Ok(Json(json!({ "ok": true, "plugin": plugin })))
}

pub async fn list_skills(State(app): State<AppState>) -> Json<Value> {
    let skills = app.server.read().await.skills.clone();
    Json(json!({ "skills": skills }))
}

pub async fn refresh_skills(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    let skills = app
        .refresh_skills()
        .await
        .map_err(|e| ApiError::Upstream(format!("Skill discovery failed: {:#}", e)))?;
    Ok(Json(json!({ "ok": true, "skills": skills })))
}

pub async fn update_skill(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SkillUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = body?;
    let (skill, runtime) = {
        let mut state = app.server.write().await;
        let runtime = state.runtime.clone();
        let skill = state
            .skills
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Skill \"{}\" not found", id)))?;
        skill.enabled = update.enabled;
        (skill.clone(), runtime)
    };

    RuntimeSkillPreferences::new(runtime)
        .set(&skill.id, update.enabled)
        .await;

    Ok(Json(json!({ "ok": true, "skill": skill })))
}

pub async fn get_logs(
    State(app): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Json<LogQueryResult> {
    Json(app.logs().query(&query))
}
