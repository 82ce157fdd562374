//! ComfyUI image relay library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `comfyui`: Thin client for ComfyUI REST endpoints and history parsing.
//! - `workflow`: Job template loading and load-image slot patching.
//! - `pipeline`: Ingest, bounded history polling and the `ImageRelay` orchestrator.
//! - `backend`: Multipart upload client for the downstream backend.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `ComfyUIClient`,
//! `JobTemplate` and `ImageRelay`.
pub mod api;
pub mod backend;
pub mod comfyui;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod workflow;

pub use comfyui::client::ComfyUIClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use pipeline::ImageRelay;
pub use workflow::JobTemplate;
