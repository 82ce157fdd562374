//! Multipart upload client for the downstream backend.
//!
//! Each image is posted on its own; a failed upload is recorded in its
//! `UploadResult` and never aborts the batch.
use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::{Serialize, Serializer};
use tokio::fs::File;

use crate::error::AppResult;

/// HTTP status returned by the backend, or `"error"` when no response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Code(u16),
    Error,
}

impl Serialize for BackendStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BackendStatus::Code(code) => serializer.serialize_u16(*code),
            BackendStatus::Error => serializer.serialize_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub image_path: String,
    pub backend_status: BackendStatus,
    pub backend_response: String,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    upload_url: String,
    caller_address: String,
}

impl BackendClient {
    pub fn new(upload_url: String, caller_address: String) -> Self {
        BackendClient { client: Client::new(), upload_url, caller_address }
    }

    pub async fn upload(&self, path: &Path) -> UploadResult {
        let image_path = path.display().to_string();
        match self.send(path).await {
            Ok((status, body)) => {
                tracing::info!(path = %image_path, status, "uploaded image to backend");
                UploadResult { image_path, backend_status: BackendStatus::Code(status), backend_response: body }
            }
            Err(e) => {
                tracing::warn!(path = %image_path, error = %e, "backend upload failed");
                UploadResult { image_path, backend_status: BackendStatus::Error, backend_response: e.to_string() }
            }
        }
    }

    async fn send(&self, path: &Path) -> AppResult<(u16, String)> {
        let file = File::open(path).await?;
        let length = file.metadata().await?.len();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.png")
            .to_string();
        let part = Part::stream_with_length(Body::from(file), length)
            .file_name(name)
            .mime_str("image/png")?;
        let form = Form::new()
            .part("file", part)
            .text("ip", self.caller_address.clone());

        let response = self.client.post(&self.upload_url).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}
