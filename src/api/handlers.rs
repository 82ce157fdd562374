//! Axum request handlers for the HTTP API.
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::ProcessReport;

pub async fn root() -> &'static str {
    "ComfyUI Image Relay"
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Accept one image under the `file` field, run it through ComfyUI and relay
/// the results to the backend.
pub async fn process_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ProcessReport>> {
    let (filename, data) = read_file_field(&mut multipart).await?;
    tracing::info!(filename = %filename, bytes = data.len(), "received image");
    let report = state.relay.process(&filename, data.as_slice()).await?;
    Ok(Json(report))
}

async fn read_file_field(multipart: &mut Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "upload.bin".to_string());
        let data = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok((filename, data.to_vec()));
    }
    Err(AppError::BadRequest("multipart field 'file' is required".to_string()))
}
