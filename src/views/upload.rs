//! CSV upload form.
//!
//! A single-flight state machine: `idle -> uploading -> success | error`.
//! Success clears itself after [`UPLOAD_CLEAR_DELAY`]; error stays until an
//! explicit reset or a new selection.

use crate::backend::{progress_percent, Backend, ProgressFn};
use crate::config::{MAX_UPLOAD_BYTES, UPLOAD_CLEAR_DELAY};
use crate::model::{FileSummary, SelectedFile, UploadResponse, UploadStatus};

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Reasons the form refuses an action. Display texts are shown inline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please upload a CSV file.")]
    NotCsv,
    #[error("File size exceeds 10MB limit.")]
    TooLarge { size: u64, limit: u64 },
    #[error("Please select a file to upload")]
    NoFile,
    #[error("An upload is already in progress")]
    Busy,
}

const REJECTED_BY_SERVER: &str = "Upload rejected by server";
const INTERRUPTED: &str = "Upload was interrupted";

/// Check the file name and size against the form's constraints.
pub fn validate_file(name: &str, size: u64, limit: u64) -> Result<(), UploadError> {
    if !name.ends_with(".csv") {
        return Err(UploadError::NotCsv);
    }
    if size > limit {
        return Err(UploadError::TooLarge { size, limit });
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct UploadSession {
    file: Option<SelectedFile>,
    status: UploadStatus,
    progress: u8,
    response: Option<UploadResponse>,
    error: Option<String>,
    drag_active: bool,
}

impl UploadSession {
    /// Back to a blank `idle` session. The drag flag tracks the pointer, not
    /// the upload, so it survives.
    fn clear(&mut self) {
        *self = UploadSession {
            drag_active: self.drag_active,
            ..Default::default()
        };
    }
}

/// What the page sees of the session. File contents stay server-side.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSnapshot {
    pub file: Option<FileSummary>,
    pub status: UploadStatus,
    pub progress: u8,
    pub response: Option<UploadResponse>,
    pub error: Option<String>,
    pub drag_active: bool,
    pub can_submit: bool,
    pub can_reset: bool,
}

fn lock(session: &Mutex<UploadSession>) -> MutexGuard<'_, UploadSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the session as interrupted if a transfer future is dropped before
/// it records an outcome.
struct TransferGuard {
    session: Arc<Mutex<UploadSession>>,
    armed: bool,
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut s = lock(&self.session);
        if s.status == UploadStatus::Uploading {
            tracing::warn!("Upload: transfer dropped before completion");
            s.status = UploadStatus::Error;
            s.error = Some(INTERRUPTED.to_string());
        }
    }
}

pub struct UploadForm {
    backend: Arc<dyn Backend>,
    session: Arc<Mutex<UploadSession>>,
    clear_task: Mutex<Option<JoinHandle<()>>>,
    max_bytes: u64,
    clear_delay: Duration,
}

impl UploadForm {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            session: Arc::new(Mutex::new(UploadSession::default())),
            clear_task: Mutex::new(None),
            max_bytes: MAX_UPLOAD_BYTES,
            clear_delay: UPLOAD_CLEAR_DELAY,
        }
    }

    pub fn with_clear_delay(mut self, delay: Duration) -> Self {
        self.clear_delay = delay;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn session(&self) -> MutexGuard<'_, UploadSession> {
        lock(&self.session)
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        let s = self.session();
        let uploading = s.status == UploadStatus::Uploading;
        UploadSnapshot {
            file: s.file.as_ref().map(SelectedFile::summary),
            status: s.status,
            progress: s.progress,
            response: s.response.clone(),
            error: s.error.clone(),
            drag_active: s.drag_active,
            can_submit: s.file.is_some() && !uploading,
            can_reset: !uploading,
        }
    }

    /// Validate and store a picked file. A rejected file leaves any previously
    /// selected file in place and records the reason. Either way a finished
    /// upload is left behind: the form drops back to `idle` and its pending
    /// auto-clear is cancelled so the new message stays up.
    pub fn select_file(&self, file: SelectedFile) -> Result<(), UploadError> {
        let outcome = {
            let mut s = self.session();
            if s.status == UploadStatus::Uploading {
                return Err(UploadError::Busy);
            }

            s.error = None;
            s.response = None;
            if s.status == UploadStatus::Success {
                s.status = UploadStatus::Idle;
                s.progress = 0;
            }

            match validate_file(&file.name, file.size(), self.max_bytes) {
                Err(e) => {
                    tracing::info!("Upload: rejected {}: {:?}", file.name, e);
                    s.error = Some(e.to_string());
                    Err(e)
                }
                Ok(()) => {
                    tracing::info!("Upload: selected {} ({} bytes)", file.name, file.size());
                    s.file = Some(file);
                    s.status = UploadStatus::Idle;
                    s.progress = 0;
                    Ok(())
                }
            }
        };
        self.cancel_auto_clear();
        outcome
    }

    pub fn drag_enter(&self) {
        self.session().drag_active = true;
    }

    pub fn drag_over(&self) {
        self.session().drag_active = true;
    }

    pub fn drag_leave(&self) {
        self.session().drag_active = false;
    }

    /// A file dropped on the drop zone takes the same path as a picked one.
    pub fn drop_file(&self, file: SelectedFile) -> Result<(), UploadError> {
        self.session().drag_active = false;
        self.select_file(file)
    }

    /// Clear everything. Not allowed mid-upload.
    pub fn reset(&self) -> Result<(), UploadError> {
        {
            let mut s = self.session();
            if s.status == UploadStatus::Uploading {
                return Err(UploadError::Busy);
            }
            s.clear();
        }
        self.cancel_auto_clear();
        Ok(())
    }

    /// Upload the selected file and wait for the outcome.
    pub async fn submit(&self) -> Result<UploadStatus, UploadError> {
        let file = self.begin()?;
        Ok(self.transfer(file).await)
    }

    /// Move to `uploading` now and run the transfer on its own task.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<UploadStatus>, UploadError> {
        let file = self.begin()?;
        let form = Arc::clone(self);
        Ok(tokio::spawn(async move { form.transfer(file).await }))
    }

    fn begin(&self) -> Result<SelectedFile, UploadError> {
        let file = {
            let mut s = self.session();
            if s.status == UploadStatus::Uploading {
                return Err(UploadError::Busy);
            }
            let Some(file) = s.file.clone() else {
                s.error = Some(UploadError::NoFile.to_string());
                return Err(UploadError::NoFile);
            };

            s.status = UploadStatus::Uploading;
            s.progress = 0;
            s.error = None;
            s.response = None;
            file
        };
        self.cancel_auto_clear();
        Ok(file)
    }

    async fn transfer(&self, file: SelectedFile) -> UploadStatus {
        let mut guard = TransferGuard {
            session: self.session.clone(),
            armed: true,
        };

        let session = self.session.clone();
        let progress: ProgressFn = Arc::new(move |sent, total| {
            let Some(pct) = progress_percent(sent, total) else {
                return;
            };
            let mut s = lock(&session);
            if s.status == UploadStatus::Uploading && pct > s.progress {
                s.progress = pct;
            }
        });

        let result = self.backend.upload(&file, progress).await;

        let status = {
            let mut s = self.session();
            match result {
                Ok(resp) if resp.success => {
                    tracing::info!("Upload: {} accepted: {}", file.name, resp.message);
                    s.status = UploadStatus::Success;
                    s.response = Some(resp);
                }
                Ok(resp) => {
                    tracing::warn!("Upload: {} rejected by server: {}", file.name, resp.message);
                    s.status = UploadStatus::Error;
                    s.error = Some(if resp.message.is_empty() {
                        REJECTED_BY_SERVER.to_string()
                    } else {
                        resp.message.clone()
                    });
                    s.response = Some(resp);
                }
                Err(e) => {
                    tracing::error!("Upload: {} failed: {:?}", file.name, e);
                    s.status = UploadStatus::Error;
                    s.error = Some(e.to_string());
                }
            }
            s.status
        };
        guard.armed = false;

        if status == UploadStatus::Success {
            self.schedule_auto_clear();
        }
        status
    }

    fn schedule_auto_clear(&self) {
        let session = self.session.clone();
        let delay = self.clear_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut s = lock(&session);
            if s.status == UploadStatus::Success {
                s.clear();
                tracing::debug!("Upload: cleared after success");
            }
        });

        let previous = self
            .clear_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel_auto_clear(&self) {
        let pending = self
            .clear_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = pending {
            handle.abort();
        }
    }
}

impl Drop for UploadForm {
    fn drop(&mut self) {
        self.cancel_auto_clear();
    }
}
