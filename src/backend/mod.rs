//! Backend module: talks JSON-over-HTTP to the alert-scoring service.
//!
//! The views depend on the [`Backend`] trait rather than on the HTTP client
//! directly, so each view can be driven by a scripted backend in tests.

mod client;
mod progress;

pub use client::*;
pub use progress::*;

use crate::model::{AlertRecord, DatasetDescriptor, SelectedFile, UploadResponse};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Backend error types. Display texts are shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Request timed out")]
    Timeout(Duration),
    #[error("Network error occurred")]
    Network(String),
    #[error("HTTP Error: {0}")]
    Status(u16),
    #[error("Invalid response format")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// Short reason phrase, e.g. `Not Found` for a 404.
    pub fn reason(&self) -> String {
        match self {
            BackendError::Status(code) => reqwest::StatusCode::from_u16(*code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string()),
            other => other.to_string(),
        }
    }
}

/// Upload progress callback: `(bytes_sent, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Operations the dashboard needs from the scoring backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /alerts`
    async fn fetch_alerts(&self) -> Result<Vec<AlertRecord>, BackendError>;

    /// `GET /external-dataset`
    async fn fetch_catalog(&self) -> Result<Vec<DatasetDescriptor>, BackendError>;

    /// `GET /external-dataset/{id}`
    async fn fetch_dataset(&self, id: &str) -> Result<serde_json::Value, BackendError>;

    /// `POST /upload` as multipart field `file`, reporting progress as the
    /// body is handed to the transport.
    async fn upload(
        &self,
        file: &SelectedFile,
        progress: ProgressFn,
    ) -> Result<UploadResponse, BackendError>;
}
