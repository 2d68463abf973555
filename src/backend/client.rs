//! reqwest implementation of [`Backend`].

use super::{progress_body, Backend, BackendError, ProgressFn};
use crate::model::{AlertRecord, DatasetDescriptor, SelectedFile, UploadResponse};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl BackendClient {
    /// Build a client for `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base = Url::parse(base_url)
            .map_err(|e| BackendError::Config(format!("invalid backend url {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Config(format!(
                "backend url cannot carry a path: {}",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Config(format!("cannot extend {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Network(e.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_json(response).await
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn fetch_alerts(&self) -> Result<Vec<AlertRecord>, BackendError> {
        self.get_json(&["alerts"]).await
    }

    async fn fetch_catalog(&self) -> Result<Vec<DatasetDescriptor>, BackendError> {
        self.get_json(&["external-dataset"]).await
    }

    async fn fetch_dataset(&self, id: &str) -> Result<serde_json::Value, BackendError> {
        self.get_json(&["external-dataset", id]).await
    }

    async fn upload(
        &self,
        file: &SelectedFile,
        progress: ProgressFn,
    ) -> Result<UploadResponse, BackendError> {
        let url = self.endpoint(&["upload"])?;
        let total = file.size();

        let part = Part::stream_with_length(progress_body(file.contents.clone(), progress), total)
            .file_name(file.name.clone())
            .mime_str("text/csv")
            .map_err(|e| BackendError::Config(e.to_string()))?;
        let form = Form::new().part("file", part);

        tracing::info!("Uploading {} ({} bytes) to {}", file.name, total, url);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{alert_json, serve};
    use axum::{
        extract::{Multipart, Path},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    fn client(base: &str) -> BackendClient {
        BackendClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_invalid_base_url() {
        let err = BackendClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));

        let err = BackendClient::new("mailto:ops@example.com", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));
    }

    #[test]
    fn test_endpoint_encoding() {
        let c = client("http://localhost:8000/");
        let url = c.endpoint(&["external-dataset", "smart home/v2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/external-dataset/smart%20home%2Fv2"
        );

        let c = client("http://localhost:8000/api");
        assert_eq!(
            c.endpoint(&["alerts"]).unwrap().as_str(),
            "http://localhost:8000/api/alerts"
        );
    }

    #[tokio::test]
    async fn test_fetch_alerts() {
        let router = Router::new().route(
            "/alerts",
            get(|| async {
                Json(serde_json::json!([
                    alert_json("a1", 95.0, "2025-03-15T10:00:00Z"),
                    alert_json("a2", 12.5, "2025-03-15T10:01:00Z"),
                ]))
            }),
        );
        let base = serve(router).await;

        let alerts = client(&base).fetch_alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id, "a1");
        assert_eq!(alerts[1].score, 12.5);
    }

    #[tokio::test]
    async fn test_fetch_alerts_without_timestamps() {
        let router = Router::new().route(
            "/alerts",
            get(|| async {
                Json(serde_json::json!([
                    {
                        "_id": "65f0c0ffee",
                        "source_ip": "10.0.0.9",
                        "score": 0.93,
                        "details": {"packet_rate": 1200, "protocol": "tcp"}
                    },
                    alert_json("a2", 40.0, "2025-03-15T10:01:00Z"),
                ]))
            }),
        );
        let base = serve(router).await;

        let alerts = client(&base).fetch_alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id, "65f0c0ffee");
        assert!(alerts[0].timestamp.is_empty());
        assert_eq!(alerts[1].id, "a2");
    }

    #[tokio::test]
    async fn test_fetch_alerts_status_and_decode_errors() {
        let router = Router::new()
            .route("/alerts", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/external-dataset", get(|| async { "not json" }));
        let base = serve(router).await;
        let c = client(&base);

        assert_eq!(c.fetch_alerts().await.unwrap_err(), BackendError::Status(503));
        assert!(matches!(
            c.fetch_catalog().await.unwrap_err(),
            BackendError::Decode(_)
        ));
    }

    #[tokio::test]
    async fn test_network_error() {
        // Nothing listens on a freshly released port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr)).fetch_alerts().await.unwrap_err();
        assert!(matches!(err, BackendError::Network(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let router = Router::new().route(
            "/alerts",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(serde_json::json!([]))
            }),
        );
        let base = serve(router).await;
        let c = BackendClient::new(&base, Duration::from_millis(100)).unwrap();

        let err = c.fetch_alerts().await.unwrap_err();
        assert_eq!(err, BackendError::Timeout(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_fetch_dataset_by_id() {
        let router = Router::new().route(
            "/external-dataset/{id}",
            get(|Path(id): Path<String>| async move {
                Json(serde_json::json!({ "id": id, "rows": [[1, 2], [3, 4]] }))
            }),
        );
        let base = serve(router).await;

        let payload = client(&base).fetch_dataset("smart-home").await.unwrap();
        assert_eq!(payload["id"], "smart-home");
        assert_eq!(payload["rows"][1][0], 3);
    }

    #[tokio::test]
    async fn test_upload_multipart_with_progress() {
        let router = Router::new().route(
            "/upload",
            post(|mut multipart: Multipart| async move {
                let mut name = String::new();
                let mut size = 0usize;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    assert_eq!(field.name(), Some("file"));
                    name = field.file_name().unwrap_or_default().to_string();
                    size = field.bytes().await.unwrap().len();
                }
                Json(serde_json::json!({
                    "success": true,
                    "message": format!("received {} ({} bytes)", name, size),
                    "fileId": "f-42",
                }))
            }),
        );
        let base = serve(router).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |sent, total| sink.lock().unwrap().push((sent, total)));

        let file = SelectedFile::new("traffic.csv", vec![b'x'; 200_000]);
        let resp = client(&base).upload(&file, progress).await.unwrap();

        assert!(resp.success);
        assert_eq!(resp.message, "received traffic.csv (200000 bytes)");
        assert_eq!(resp.file_id.as_deref(), Some("f-42"));

        let seen = seen.lock().unwrap().clone();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen.last().copied(), Some((200_000, 200_000)));
    }

    #[tokio::test]
    async fn test_upload_http_error() {
        let router = Router::new().route(
            "/upload",
            post(|mut multipart: Multipart| async move {
                while let Ok(Some(field)) = multipart.next_field().await {
                    let _ = field.bytes().await;
                }
                (StatusCode::INTERNAL_SERVER_ERROR, "boom")
            }),
        );
        let base = serve(router).await;

        let file = SelectedFile::new("traffic.csv", "a,b\n1,2\n");
        let err = client(&base)
            .upload(&file, Arc::new(|_, _| {}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP Error: 500");
    }
}
