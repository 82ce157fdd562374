//! `ImageRelay` runs one upload through ComfyUI and on to the backend.
//!
//! Phases run strictly in order for each request: ingest the upload into the
//! shared input directory, dispatch the patched template, await the save
//! node's images, then relay every produced file downstream.
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncRead;

use crate::backend::{BackendClient, UploadResult};
use crate::comfyui::client::ComfyUIClient;
use crate::comfyui::history::{produced_images, Artifact};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::pipeline::ingest;
use crate::pipeline::poll::{self, PollPolicy};
use crate::workflow::JobTemplate;

#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub status: &'static str,
    pub processed_images: Vec<String>,
    pub backend_uploads: Vec<UploadResult>,
}

#[derive(Clone)]
pub struct ImageRelay {
    config: Config,
    comfyui: ComfyUIClient,
    backend: BackendClient,
    policy: PollPolicy,
}

impl ImageRelay {
    pub fn new(config: Config) -> Self {
        let comfyui = ComfyUIClient::new(config.comfyui_url.clone());
        let backend = BackendClient::new(config.upload_url(), config.caller_address.clone());
        let policy = PollPolicy {
            max_attempts: config.poll_max_attempts,
            interval: config.poll_interval,
        };
        ImageRelay { config, comfyui, backend, policy }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn comfyui(&self) -> &ComfyUIClient {
        &self.comfyui
    }

    pub async fn process<R>(&self, original_filename: &str, source: R) -> AppResult<ProcessReport>
    where
        R: AsyncRead + Unpin,
    {
        let filename = ingest::store_upload(&self.config.comfyui_input_dir, original_filename, source).await?;
        let prompt_id = self.dispatch(&filename).await?;
        let images = self.await_images(&prompt_id).await?;
        self.relay(&images).await
    }

    /// Load the template fresh, bind the ingested file and queue it.
    pub async fn dispatch(&self, filename: &str) -> AppResult<String> {
        let mut template = JobTemplate::load(
            &self.config.workflow_template,
            &self.config.load_image_node_id,
            &self.config.save_image_node_id,
        )
        .await?;
        template.bind_input_image(&self.config.load_image_node_id, filename)?;
        self.comfyui.queue_prompt(&template.into_request_body()).await
    }

    /// Poll history until the save node reports images.
    pub async fn await_images(&self, prompt_id: &str) -> AppResult<Vec<Value>> {
        let save_node_id = self.config.save_image_node_id.as_str();
        let state = poll::run(&self.policy, |attempt| async move {
            tracing::debug!(prompt_id, attempt, "checking ComfyUI history");
            let history = self.comfyui.get_history(prompt_id).await;
            history.and_then(|h| produced_images(&h, prompt_id, save_node_id))
        })
        .await;

        match &state {
            poll::AwaitState::Succeeded { attempts, .. } => {
                tracing::info!(prompt_id, attempts, "workflow produced images")
            }
            _ => tracing::error!(prompt_id, state = ?state, "workflow did not produce images"),
        }
        state.into_result()
    }

    /// Resolve image descriptors to paths and upload the ones present on disk.
    pub async fn relay(&self, images: &[Value]) -> AppResult<ProcessReport> {
        let base_dir = self.config.comfyui_base_dir()?;
        let paths: Vec<PathBuf> = images
            .iter()
            .filter_map(Artifact::from_value)
            .map(|artifact| artifact.resolve(&base_dir))
            .collect();
        if paths.is_empty() {
            return Err(AppError::NotFound);
        }

        let mut backend_uploads = Vec::new();
        for path in &paths {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                tracing::warn!(path = %path.display(), "output image missing on disk, skipping");
                continue;
            }
            backend_uploads.push(self.backend.upload(path).await);
        }

        Ok(ProcessReport {
            status: "success",
            processed_images: paths.iter().map(|p| p.display().to_string()).collect(),
            backend_uploads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendStatus;
    use httpmock::MockServer;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::Path;

    fn relay_for(base: &Path, backend_url: &str, engine_url: &str) -> ImageRelay {
        let mut vars = HashMap::new();
        vars.insert("COMFYUI_INPUT_DIR", base.join("input").display().to_string());
        vars.insert("BACKEND_URL", backend_url.to_string());
        vars.insert("COMFYUI_URL", engine_url.to_string());
        vars.insert("WORKFLOW_TEMPLATE", base.join("workflow.json").display().to_string());
        vars.insert("POLL_MAX_ATTEMPTS", "3".to_string());
        vars.insert("POLL_INTERVAL_MS", "1".to_string());
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("config");
        ImageRelay::new(config)
    }

    #[tokio::test]
    async fn relay_without_resolvable_images_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let relay = relay_for(dir.path(), "http://127.0.0.1:9", "http://127.0.0.1:9");
        let err = relay.relay(&[]).await.expect_err("no images");
        assert!(matches!(err, AppError::NotFound));
        let err = relay.relay(&[json!({"subfolder": "x"})]).await.expect_err("malformed");
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn relay_skips_missing_files_and_reports_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let relay = relay_for(dir.path(), "http://127.0.0.1:9", "http://127.0.0.1:9");
        let report = relay
            .relay(&[json!({"filename": "gone.png", "subfolder": ""})])
            .await
            .expect("lenient");
        assert_eq!(report.status, "success");
        assert_eq!(report.processed_images.len(), 1);
        assert!(report.backend_uploads.is_empty());
    }

    #[tokio::test]
    async fn relay_uploads_existing_files_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("output/x")).expect("mkdir");
        std::fs::write(dir.path().join("output/x/out.png"), b"png").expect("write");
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/upload");
            then.status(201).body("ok");
        });

        let relay = relay_for(dir.path(), &server.base_url(), "http://127.0.0.1:9");
        let report = relay
            .relay(&[
                json!({"filename": "out.png", "subfolder": "x", "type": "output"}),
                json!({"filename": "missing.png", "subfolder": "x", "type": "output"}),
            ])
            .await
            .expect("report");
        mock.assert();
        assert_eq!(report.processed_images.len(), 2);
        assert_eq!(report.backend_uploads.len(), 1);
        assert_eq!(report.backend_uploads[0].backend_status, BackendStatus::Code(201));
    }

    #[tokio::test]
    async fn dispatch_never_submits_without_load_node() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("workflow.json"),
            json!({"23": {"class_type": "SaveImage", "inputs": {}}}).to_string(),
        )
        .expect("template");
        // Nothing listens on the engine port: reaching it would surface as a dispatch error.
        let relay = relay_for(dir.path(), "http://127.0.0.1:9", "http://127.0.0.1:9");
        let err = relay.dispatch("cat.jpg").await.expect_err("no load node");
        assert!(matches!(err, AppError::TemplateLoad(_)));
    }

    #[tokio::test]
    async fn dispatch_fails_when_template_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let relay = relay_for(dir.path(), "http://127.0.0.1:9", "http://127.0.0.1:9");
        let err = relay.dispatch("cat.jpg").await.expect_err("no template");
        assert!(matches!(err, AppError::TemplateLoad(_)));
    }

    #[tokio::test]
    async fn await_fails_when_history_keeps_erroring() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/history/abc123");
            then.status(500);
        });

        let relay = relay_for(dir.path(), "http://127.0.0.1:9", &server.base_url());
        let err = relay.await_images("abc123").await.expect_err("failed");
        assert!(matches!(err, AppError::AwaitFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn await_exhausts_when_images_never_appear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/history/abc123");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"abc123":{"outputs":{"23":{"images":[]}}}}"#);
        });

        let relay = relay_for(dir.path(), "http://127.0.0.1:9", &server.base_url());
        let err = relay.await_images("abc123").await.expect_err("exhausted");
        assert!(matches!(err, AppError::AwaitExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn await_fails_when_history_record_is_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/history/abc123");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"abc123":"garbage"}"#);
        });

        let relay = relay_for(dir.path(), "http://127.0.0.1:9", &server.base_url());
        match relay.await_images("abc123").await {
            Err(AppError::AwaitFailed { attempts, cause }) => {
                assert_eq!(attempts, 3);
                assert!(cause.to_string().contains("malformed history record"));
            }
            other => panic!("expected AwaitFailed, got {:?}", other),
        }
    }
}
