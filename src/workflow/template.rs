//! Job template loading and slot patching.
//!
//! A template is a mapping from opaque node ids to node records. Only two
//! configured ids are interpreted: the load-image node, whose `inputs.image`
//! receives the ingested filename, and the save-image node, whose outputs are
//! read back from history. The graph itself is never traversed.
use std::path::Path;

use serde_json::{json, Map, Value};
use tokio::fs;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct JobTemplate {
    nodes: Map<String, Value>,
}

impl JobTemplate {
    /// Read a template from disk. Accepts both the bare graph and the
    /// `{"prompt": {...}}` wrapped form.
    pub async fn load(path: &Path, load_node_id: &str, save_node_id: &str) -> AppResult<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            AppError::TemplateLoad(format!("failed to read {}: {}", path.display(), e))
        })?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| {
            AppError::TemplateLoad(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Self::from_value(raw, load_node_id, save_node_id)
    }

    pub fn from_value(raw: Value, load_node_id: &str, save_node_id: &str) -> AppResult<Self> {
        let graph = match raw {
            Value::Object(mut map) => match map.remove("prompt") {
                Some(Value::Object(inner)) => inner,
                Some(_) => return Err(AppError::TemplateLoad("'prompt' is not an object".to_string())),
                None => map,
            },
            _ => return Err(AppError::TemplateLoad("template root is not an object".to_string())),
        };

        let has_inputs = graph
            .get(load_node_id)
            .and_then(|node| node.get("inputs"))
            .map(Value::is_object)
            .unwrap_or(false);
        if !has_inputs {
            return Err(AppError::TemplateLoad(format!(
                "load-image node '{}' with an 'inputs' object not found",
                load_node_id
            )));
        }
        if !graph.contains_key(save_node_id) {
            return Err(AppError::TemplateLoad(format!(
                "save-image node '{}' not found",
                save_node_id
            )));
        }

        Ok(JobTemplate { nodes: graph })
    }

    /// Point the load-image node at `filename`, relative to ComfyUI's input directory.
    pub fn bind_input_image(&mut self, load_node_id: &str, filename: &str) -> AppResult<()> {
        let inputs = self
            .nodes
            .get_mut(load_node_id)
            .and_then(|node| node.get_mut("inputs"))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                AppError::TemplateLoad(format!("load-image node '{}' has no inputs", load_node_id))
            })?;
        inputs.insert("image".to_string(), Value::String(filename.to_string()));
        Ok(())
    }

    /// Body for ComfyUI's `/prompt` endpoint.
    pub fn into_request_body(self) -> Value {
        json!({ "prompt": Value::Object(self.nodes) })
    }
}
