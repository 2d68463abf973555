//! Dataset selector: catalog, per-dataset loading and local file intake.

use super::upload::{UploadError, UploadForm};
use crate::backend::Backend;
use crate::model::{fallback_catalog, format_count, DatasetDescriptor, SelectedFile};

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct SelectorState {
    catalog: Vec<DatasetDescriptor>,
    catalog_loading: bool,
    using_fallback: bool,
    selected: Option<String>,
    pending: Option<String>,
    error: Option<String>,
    seq: u64,
}

/// A catalog entry as drawn on the page.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetCard {
    #[serde(flatten)]
    pub descriptor: DatasetDescriptor,
    pub record_count_display: String,
    pub selected: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectorSnapshot {
    pub datasets: Vec<DatasetCard>,
    pub catalog_loading: bool,
    pub using_fallback: bool,
    pub pending: Option<String>,
    pub error: Option<String>,
}

/// Payload of a dataset the user picked.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedDataset {
    pub id: String,
    pub payload: serde_json::Value,
}

pub struct DatasetSelector {
    backend: Arc<dyn Backend>,
    upload: Arc<UploadForm>,
    state: Mutex<SelectorState>,
}

impl DatasetSelector {
    /// The selector shares the upload form so local files go through the
    /// same validation and upload path as the form itself.
    pub fn new(backend: Arc<dyn Backend>, upload: Arc<UploadForm>) -> Self {
        Self {
            backend,
            upload,
            state: Mutex::new(SelectorState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SelectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the catalog. Any failure installs the built-in samples instead
    /// of surfacing an error.
    pub async fn load_catalog(&self) {
        self.state().catalog_loading = true;

        let result = self.backend.fetch_catalog().await;

        let mut state = self.state();
        state.catalog_loading = false;
        match result {
            Ok(catalog) => {
                tracing::info!("Datasets: loaded catalog with {} entries", catalog.len());
                state.catalog = catalog;
                state.using_fallback = false;
            }
            Err(e) => {
                tracing::warn!("Datasets: catalog unavailable ({:?}), using samples", e);
                state.catalog = fallback_catalog();
                state.using_fallback = true;
            }
        }
    }

    /// Load one dataset by id. Only the latest selection updates the pending
    /// marker and inline error; superseded ones just return their result.
    pub async fn select(&self, id: &str) -> Result<LoadedDataset, String> {
        let seq = {
            let mut state = self.state();
            state.seq += 1;
            state.selected = Some(id.to_string());
            state.pending = Some(id.to_string());
            state.error = None;
            state.seq
        };

        let result = self.backend.fetch_dataset(id).await;

        let mut state = self.state();
        let current = state.seq == seq;
        if current {
            state.pending = None;
        }

        match result {
            Ok(payload) => {
                tracing::info!("Datasets: loaded {}", id);
                Ok(LoadedDataset {
                    id: id.to_string(),
                    payload,
                })
            }
            Err(e) => {
                let message = format!("Failed to load dataset: {}", e.reason());
                tracing::warn!("Datasets: {} ({:?})", message, e);
                if current {
                    state.error = Some(message.clone());
                }
                Err(message)
            }
        }
    }

    /// A file picked or dropped on the selector goes to the upload form.
    pub fn accept_local_file(&self, file: SelectedFile) -> Result<(), UploadError> {
        self.upload.select_file(file)
    }

    pub fn upload_form(&self) -> &Arc<UploadForm> {
        &self.upload
    }

    pub fn snapshot(&self) -> SelectorSnapshot {
        let state = self.state();
        let datasets = state
            .catalog
            .iter()
            .map(|d| DatasetCard {
                descriptor: d.clone(),
                record_count_display: format_count(d.record_count),
                selected: state.selected.as_deref() == Some(d.id.as_str()),
                loading: state.pending.as_deref() == Some(d.id.as_str()),
            })
            .collect();

        SelectorSnapshot {
            datasets,
            catalog_loading: state.catalog_loading,
            using_fallback: state.using_fallback,
            pending: state.pending.clone(),
            error: state.error.clone(),
        }
    }
}
