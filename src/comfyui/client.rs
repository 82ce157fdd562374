//! Thin HTTP client for the ComfyUI endpoints the relay needs.
//!
//! - `queue_prompt` posts a job template to `/prompt` and returns its `prompt_id`.
//! - `get_history` fetches `/history/{prompt_id}` as JSON.
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ComfyUIClient {
    client: Client,
    base_url: String,
}

impl ComfyUIClient {
    pub fn new(base_url: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        ComfyUIClient { client: Client::new(), base_url: base }
    }

    /// Queue a prompt with ComfyUI.
    ///
    /// `body` is the full `{"prompt": {...}}` document. Any failure to get a
    /// `prompt_id` back is a dispatch error.
    pub async fn queue_prompt(&self, body: &Value) -> AppResult<String> {
        let url = format!("{}/prompt", self.base_url);
        tracing::info!("Sending prompt to ComfyUI at URL: {}", url);
        tracing::debug!("Prompt payload: {:?}", body);

        let response = self.client.post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Dispatch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Status: {}, Body: {}", status, error_body);
            tracing::error!("Failed to queue prompt. {}", error_message);
            return Err(AppError::Dispatch(error_message));
        }

        let json: Value = response.json().await.map_err(|e| AppError::Dispatch(e.to_string()))?;
        let prompt_id = json.get("prompt_id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| AppError::Dispatch(format!("response has no prompt_id: {}", json)))?;
        tracing::info!(prompt_id = %prompt_id, "Successfully queued prompt");
        Ok(prompt_id)
    }

    /// Retrieve the execution history of one prompt.
    pub async fn get_history(&self, prompt_id: &str) -> AppResult<Value> {
        let url = format!("{}/history/{}", self.base_url, prompt_id);
        let response = self.client.get(&url)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            response.json().await.map_err(AppError::HttpClient)
        } else {
            Err(AppError::ComfyUI(format!("Failed to get history: {:?}", response.status())))
        }
    }
}
