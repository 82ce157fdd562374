//! Reading produced images out of a ComfyUI history record.
//!
//! History for one prompt looks like
//! `{"<prompt_id>": {"outputs": {"<node_id>": {"images": [{"filename", "subfolder", "type"}]}}}}`.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Image descriptors reported for `save_node_id`.
///
/// `Ok(None)` while the prompt is absent from history or the node has not
/// produced anything yet. A record whose shape does not match the layout
/// above is an error, so it counts as a fault for that poll attempt.
pub fn produced_images(history: &Value, prompt_id: &str, save_node_id: &str) -> AppResult<Option<Vec<Value>>> {
    let root = history
        .as_object()
        .ok_or_else(|| malformed(prompt_id, "history is not an object"))?;
    let record = match root.get(prompt_id) {
        Some(record) => record
            .as_object()
            .ok_or_else(|| malformed(prompt_id, "record is not an object"))?,
        None => return Ok(None),
    };
    let outputs = match record.get("outputs") {
        Some(outputs) => outputs
            .as_object()
            .ok_or_else(|| malformed(prompt_id, "'outputs' is not an object"))?,
        None => return Ok(None),
    };
    let node = match outputs.get(save_node_id) {
        Some(node) => node
            .as_object()
            .ok_or_else(|| malformed(prompt_id, "save node output is not an object"))?,
        None => return Ok(None),
    };
    let images = match node.get("images") {
        Some(images) => images
            .as_array()
            .ok_or_else(|| malformed(prompt_id, "'images' is not an array"))?,
        None => return Ok(None),
    };
    Ok(if images.is_empty() { None } else { Some(images.clone()) })
}

fn malformed(prompt_id: &str, detail: &str) -> AppError {
    AppError::ComfyUI(format!("malformed history record for {}: {}", prompt_id, detail))
}

/// One output file descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Artifact {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
}

impl Artifact {
    /// Descriptors without a string `filename` yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        Artifact::deserialize(value).ok()
    }

    /// `<base>/output/<subfolder>/<filename>`
    pub fn resolve(&self, comfyui_base_dir: &Path) -> PathBuf {
        let mut path = comfyui_base_dir.join("output");
        if !self.subfolder.is_empty() {
            path.push(&self.subfolder);
        }
        path.push(&self.filename);
        path
    }
}
