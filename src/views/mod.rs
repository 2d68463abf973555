//! View components: each owns its own state and fetch lifecycle.

mod chart;
mod datasets;
mod table;
mod upload;

pub use chart::*;
pub use datasets::*;
pub use table::*;
pub use upload::*;

use crate::backend::Backend;
use crate::poller::{AlertPoller, PollerKind};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

/// The page: every component, mounted side by side.
pub struct Dashboard {
    pub table: AlertPoller,
    pub chart: AlertPoller,
    pub upload: Arc<UploadForm>,
    pub datasets: Arc<DatasetSelector>,
    catalog_task: Mutex<Option<AbortHandle>>,
}

impl Dashboard {
    /// Start both pollers and build the selector and upload form. The
    /// catalog is fetched separately by [`Dashboard::mount_catalog`].
    pub fn mount(backend: Arc<dyn Backend>, poll_interval: Duration) -> Self {
        let upload = Arc::new(UploadForm::new(backend.clone()));
        let datasets = Arc::new(DatasetSelector::new(backend.clone(), upload.clone()));

        Self {
            table: AlertPoller::spawn(PollerKind::Table, backend.clone(), poll_interval),
            chart: AlertPoller::spawn(PollerKind::Chart, backend, poll_interval),
            upload,
            datasets,
            catalog_task: Mutex::new(None),
        }
    }

    /// Fetch the dataset catalog once, in the background. The dashboard keeps
    /// an abort handle, so the fetch dies with it; the returned handle is only
    /// for callers that want to wait.
    pub fn mount_catalog(&self) -> JoinHandle<()> {
        let datasets = self.datasets.clone();
        let handle = tokio::spawn(async move { datasets.load_catalog().await });

        let previous = self
            .catalog_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
        handle
    }

    pub fn table_view(&self) -> TableView {
        TableView::from_snapshot(&self.table.snapshot())
    }

    pub fn chart_view(&self) -> ChartView {
        ChartView::from_snapshot(&self.chart.snapshot())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let pending = self
            .catalog_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = pending {
            task.abort();
        }
    }
}
