//! Upload session types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Status of the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Success,
    Error,
}

/// A file picked by the user, held in memory until it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub contents: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, contents))
    }

    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            name: self.name.clone(),
            size: self.size(),
        }
    }
}

/// File metadata exposed to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub size: u64,
}

/// Reply from `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawUploadResponse")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "fileId", skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawUploadResponse {
    success: Option<bool>,
    status: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "fileId", alias = "file_id", default)]
    file_id: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawUploadResponse> for UploadResponse {
    type Error = String;

    fn try_from(raw: RawUploadResponse) -> Result<Self, Self::Error> {
        let success = match (raw.success, &raw.status) {
            (Some(flag), _) => flag,
            (None, Some(Value::String(status))) => status == "success",
            _ => return Err("missing `success` flag".to_string()),
        };

        let mut extra = raw.extra;
        if let Some(status) = raw.status {
            extra.insert("status".to_string(), status);
        }

        Ok(Self {
            success,
            message: raw.message.unwrap_or_default(),
            file_id: raw.file_id,
            extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_success_flag() {
        let json = r#"{"success":true,"message":"stored","fileId":"f-1","rows":42}"#;
        let resp: UploadResponse = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.message, "stored");
        assert_eq!(resp.file_id.as_deref(), Some("f-1"));
        assert_eq!(resp.extra["rows"], 42);
    }

    #[test]
    fn test_response_with_status_string() {
        let json = r#"{"status":"success","triggered_ips":["10.0.0.9"],"predictions":[0.1,0.95]}"#;
        let resp: UploadResponse = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.message, "");
        assert_eq!(resp.extra["status"], "success");
        assert_eq!(resp.extra["triggered_ips"][0], "10.0.0.9");

        let failed: UploadResponse = serde_json::from_str(r#"{"status":"error","message":"bad csv"}"#).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.message, "bad csv");
    }

    #[test]
    fn test_response_without_flag_is_rejected() {
        assert!(serde_json::from_str::<UploadResponse>(r#"{"message":"?"}"#).is_err());
        assert!(serde_json::from_str::<UploadResponse>(r#"[1,2]"#).is_err());
    }

    #[test]
    fn test_serialize_keeps_wire_names() {
        let resp = UploadResponse {
            success: true,
            message: "ok".to_string(),
            file_id: Some("abc".to_string()),
            extra: Map::new(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["fileId"], "abc");
        assert_eq!(value["success"], true);
    }

    #[tokio::test]
    async fn test_selected_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        tokio::fs::write(&path, b"ts,value\n1,2\n").await.unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "readings.csv");
        assert_eq!(file.size(), 13);
        assert_eq!(file.summary().name, "readings.csv");
    }
}
