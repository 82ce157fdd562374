//! Downstream service that receives the produced images.
pub mod client;

pub use client::{BackendClient, BackendStatus, UploadResult};
