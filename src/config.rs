//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults mirror a local ComfyUI install and are meant for
//! development. The resulting `Config` is handed to the relay explicitly.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

const VARS: &[&str] = &[
    "COMFYUI_URL",
    "COMFYUI_INPUT_DIR",
    "LOAD_IMAGE_NODE_ID",
    "SAVE_IMAGE_NODE_ID",
    "WORKFLOW_TEMPLATE",
    "BACKEND_URL",
    "CALLER_ADDRESS",
    "POLL_MAX_ATTEMPTS",
    "POLL_INTERVAL_MS",
    "MAX_UPLOAD_BYTES",
    "API_HOST",
    "API_PORT",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub comfyui_url: String,
    pub comfyui_input_dir: PathBuf,
    pub load_image_node_id: String,
    pub save_image_node_id: String,
    pub workflow_template: PathBuf,
    pub backend_url: String,
    pub caller_address: String,
    pub poll_max_attempts: u32,
    pub poll_interval: Duration,
    pub max_upload_bytes: usize,
    pub api_host: String,
    pub api_port: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let poll_max_attempts: u32 = parse_number("POLL_MAX_ATTEMPTS", &get("POLL_MAX_ATTEMPTS", "30"))?;
        if poll_max_attempts == 0 {
            return Err(AppError::Configuration("POLL_MAX_ATTEMPTS must be at least 1".to_string()));
        }
        let poll_interval_ms: u64 = parse_number("POLL_INTERVAL_MS", &get("POLL_INTERVAL_MS", "1000"))?;
        let max_upload_bytes: usize = parse_number("MAX_UPLOAD_BYTES", &get("MAX_UPLOAD_BYTES", "26214400"))?;

        Ok(Config {
            comfyui_url: get("COMFYUI_URL", "http://127.0.0.1:8188").trim_end_matches('/').to_string(),
            comfyui_input_dir: PathBuf::from(get("COMFYUI_INPUT_DIR", "./ComfyUI/input")),
            load_image_node_id: get("LOAD_IMAGE_NODE_ID", "12"),
            save_image_node_id: get("SAVE_IMAGE_NODE_ID", "23"),
            workflow_template: PathBuf::from(get("WORKFLOW_TEMPLATE", "workflows/image_to_image.json")),
            backend_url: get("BACKEND_URL", "http://127.0.0.1:5000").trim_end_matches('/').to_string(),
            caller_address: get("CALLER_ADDRESS", "http://127.0.0.1:2310/"),
            poll_max_attempts,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_upload_bytes,
            api_host: get("API_HOST", "0.0.0.0"),
            api_port: get("API_PORT", "2310"),
        })
    }

    /// Base directory of the ComfyUI install, taken as the parent of its input directory.
    pub fn comfyui_base_dir(&self) -> AppResult<PathBuf> {
        self.comfyui_input_dir
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "ComfyUI input directory has no parent: {}",
                    self.comfyui_input_dir.display()
                ))
            })
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.backend_url)
    }

    pub fn log_env_vars() {
        for key in VARS {
            let value = env::var(key).unwrap_or_else(|_| "<unset>".to_string());
            tracing::info!("{}: {}", key, value);
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Configuration(format!("{} is not a valid number: '{}'", key, raw)))
}
