use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::lifecycle::LifecycleError;
use crate::plugins::RegistryError;
use crate::types::{PluginEntry, ValidationIssue};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{message}")]
    Validation {
        message: String,
        plugin: Box<PluginEntry>,
        errors: Vec<ValidationIssue>,
    },

    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation {
                message,
                plugin,
                errors,
            } => json!({
                "error": message,
                "validationErrors": errors,
                "plugin": plugin,
            }),
            other => json!({ "error": other.to_string() }),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RegistryError::Rejected { id, plugin, errors } => ApiError::Validation {
                message: format!("Plugin \"{}\" config rejected", id),
                plugin,
                errors,
            },
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Conflict | LifecycleError::Transition(_) => {
                ApiError::Conflict(err.to_string())
            }
            LifecycleError::Unsupported => ApiError::Unsupported(err.to_string()),
            LifecycleError::RestartFailed(_) | LifecycleError::ResetFailed(_) => {
                ApiError::Upstream(err.to_string())
            }
        }
    }
}
