//! HTTP boundary errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::build::BuildError;
use crate::render::{RenderError, TemplateError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no route matches {0}")]
    NotFound(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::NotFound(path) => {
                tracing::warn!(path = %path, "No matching route found");
                self.to_string()
            }
            other => {
                tracing::error!(error = %other, "Page assembly failed");
                "error rendering page".to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
