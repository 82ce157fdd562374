//! Job templates submitted to ComfyUI.
pub mod template;

pub use template::JobTemplate;
