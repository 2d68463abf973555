//! Shared fixtures for unit tests.

use crate::backend::{Backend, BackendError, ProgressFn};
use crate::model::{AlertRecord, DatasetDescriptor, SelectedFile, UploadResponse};

use async_trait::async_trait;
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn alert_json(id: &str, score: f64, timestamp: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "source_ip": "192.168.1.10",
        "score": score,
        "timestamp": timestamp,
        "alert_type": "port_scan",
    })
}

pub fn alert(id: &str, score: f64, timestamp: &str) -> AlertRecord {
    serde_json::from_value(alert_json(id, score, timestamp)).unwrap()
}

type AlertScript = (Duration, Result<Vec<AlertRecord>, BackendError>);
type UploadScript = (Duration, Result<UploadResponse, BackendError>);

/// In-memory [`Backend`] driven by queued responses.
///
/// Alert responses are consumed in order; the last one repeats.
#[derive(Default)]
pub struct ScriptedBackend {
    alerts: Mutex<VecDeque<AlertScript>>,
    alert_calls: AtomicUsize,
    catalog: Mutex<Option<Result<Vec<DatasetDescriptor>, BackendError>>>,
    catalog_delay: Mutex<Duration>,
    datasets: Mutex<HashMap<String, (Duration, Result<serde_json::Value, BackendError>)>>,
    upload: Mutex<Option<UploadScript>>,
    uploads: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_alerts(&self, delay: Duration, result: Result<Vec<AlertRecord>, BackendError>) {
        self.alerts.lock().unwrap().push_back((delay, result));
    }

    pub fn alert_calls(&self) -> usize {
        self.alert_calls.load(Ordering::SeqCst)
    }

    pub fn set_catalog(&self, result: Result<Vec<DatasetDescriptor>, BackendError>) {
        *self.catalog.lock().unwrap() = Some(result);
    }

    pub fn delay_catalog(&self, delay: Duration) {
        *self.catalog_delay.lock().unwrap() = delay;
    }

    pub fn set_dataset(
        &self,
        id: &str,
        delay: Duration,
        result: Result<serde_json::Value, BackendError>,
    ) {
        self.datasets
            .lock()
            .unwrap()
            .insert(id.to_string(), (delay, result));
    }

    pub fn set_upload(&self, delay: Duration, result: Result<UploadResponse, BackendError>) {
        *self.upload.lock().unwrap() = Some((delay, result));
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

pub fn upload_ok(message: &str) -> UploadResponse {
    UploadResponse {
        success: true,
        message: message.to_string(),
        file_id: Some("file-1".to_string()),
        extra: Default::default(),
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn fetch_alerts(&self) -> Result<Vec<AlertRecord>, BackendError> {
        self.alert_calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut queue = self.alerts.lock().unwrap();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match next {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<DatasetDescriptor>, BackendError> {
        let delay = *self.catalog_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(BackendError::Status(404)))
    }

    async fn fetch_dataset(&self, id: &str) -> Result<serde_json::Value, BackendError> {
        let entry = self.datasets.lock().unwrap().get(id).cloned();
        match entry {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Err(BackendError::Status(404)),
        }
    }

    async fn upload(
        &self,
        file: &SelectedFile,
        progress: ProgressFn,
    ) -> Result<UploadResponse, BackendError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let script = self.upload.lock().unwrap().clone();
        let (delay, result) = script.unwrap_or_else(|| (Duration::ZERO, Ok(upload_ok("stored"))));

        let total = file.size();
        progress(total / 2, total);
        tokio::time::sleep(delay).await;
        progress(total, total);
        result
    }
}
