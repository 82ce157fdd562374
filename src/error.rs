//! Common error type for the relay and its HTTP surface.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load workflow template: {0}")]
    TemplateLoad(String),

    #[error("Failed to dispatch workflow to ComfyUI: {0}")]
    Dispatch(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("ComfyUI error: {0}")]
    ComfyUI(String),

    #[error("No result from ComfyUI after {attempts} attempts or the image was not produced")]
    AwaitExhausted { attempts: u32 },

    #[error("Failed to fetch ComfyUI history after {attempts} attempts: {cause}")]
    AwaitFailed {
        attempts: u32,
        #[source]
        cause: Box<AppError>,
    },

    #[error("No images found in workflow result")]
    NotFound,

    #[error("Invalid upload: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(status = status.as_u16(), error = %self, "request failed");
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404_and_await_failures_to_500() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::AwaitExhausted { attempts: 30 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let failed = AppError::AwaitFailed {
            attempts: 30,
            cause: Box::new(AppError::ComfyUI("status 502".into())),
        };
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(failed.to_string().contains("status 502"));
    }

    #[test]
    fn await_failed_exposes_its_cause_as_source() {
        use std::error::Error;
        let failed = AppError::AwaitFailed {
            attempts: 2,
            cause: Box::new(AppError::ComfyUI("boom".into())),
        };
        let source = failed.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("ComfyUI error: boom"));
    }
}
