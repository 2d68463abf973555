//! Alert poller: one background task per consumer, re-fetching on a timer.
//!
//! Each poller owns its task. Dropping the poller aborts the task, so no
//! timer outlives the view that started it. Fetches are never cancelled;
//! instead every fetch takes a ticket when issued and a completed fetch is
//! applied only if nothing issued after it has been applied already.

use crate::backend::Backend;
use crate::model::{sort_alerts, AlertRecord, SortOrder};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Which view a poller feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerKind {
    Table,
    Chart,
}

impl PollerKind {
    pub fn order(self) -> SortOrder {
        match self {
            PollerKind::Table => SortOrder::Descending,
            PollerKind::Chart => SortOrder::Ascending,
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            PollerKind::Table => "Failed to load alert data. Please try again later.",
            PollerKind::Chart => "Failed to load chart data. Please try again later.",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PollerKind::Table => "table",
            PollerKind::Chart => "chart",
        }
    }
}

/// Point-in-time copy of a poller's state.
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    pub alerts: Vec<AlertRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct PollState {
    alerts: Vec<AlertRecord>,
    error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    in_flight: usize,
    issued: u64,
    applied: u64,
}

struct Shared {
    backend: Arc<dyn Backend>,
    kind: PollerKind,
    state: Mutex<PollState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the in-flight count even if the fetch future is dropped.
struct InFlight<'a>(&'a Shared);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Periodically fetches the alert collection for one view.
pub struct AlertPoller {
    shared: Arc<Shared>,
    interval: Duration,
    task: JoinHandle<()>,
}

impl AlertPoller {
    /// Start polling immediately, then every `interval`.
    pub fn spawn(kind: PollerKind, backend: Arc<dyn Backend>, interval: Duration) -> Self {
        let shared = Arc::new(Shared {
            backend,
            kind,
            state: Mutex::new(PollState::default()),
        });

        tracing::info!(
            "Poller: starting {} poller every {:?}",
            kind.name(),
            interval
        );
        let task = tokio::spawn(run_poll_loop(shared.clone(), interval));

        Self {
            shared,
            interval,
            task,
        }
    }

    pub fn kind(&self) -> PollerKind {
        self.shared.kind
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch now, outside the timer. The timer keeps its schedule.
    pub async fn refresh(&self) {
        fetch_once(&self.shared).await;
    }

    pub fn snapshot(&self) -> PollSnapshot {
        let state = self.shared.state();
        PollSnapshot {
            alerts: state.alerts.clone(),
            loading: state.in_flight > 0,
            error: state.error.clone(),
            last_updated: state.last_updated,
        }
    }

    /// Stop the timer. Equivalent to dropping the poller.
    pub fn shutdown(self) {}
}

impl Drop for AlertPoller {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!("Poller: stopped {} poller", self.shared.kind.name());
    }
}

/// Timer loop for one poller. Ticks never overlap: a slow fetch delays the
/// next tick and missed ticks are skipped.
async fn run_poll_loop(shared: Arc<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        fetch_once(&shared).await;
    }
}

async fn fetch_once(shared: &Shared) {
    let ticket = {
        let mut state = shared.state();
        state.in_flight += 1;
        state.issued += 1;
        state.issued
    };
    let guard = InFlight(shared);

    let result = shared.backend.fetch_alerts().await;
    drop(guard);

    let kind = shared.kind;
    let mut state = shared.state();
    if ticket < state.applied {
        tracing::debug!(
            "Poller: discarding stale {} response #{} (have #{})",
            kind.name(),
            ticket,
            state.applied
        );
        return;
    }
    state.applied = ticket;

    match result {
        Ok(mut alerts) => {
            sort_alerts(&mut alerts, kind.order());
            tracing::debug!("Poller: {} received {} alerts", kind.name(), alerts.len());
            state.alerts = alerts;
            state.error = None;
            state.last_updated = Some(Utc::now());
        }
        Err(e) => {
            tracing::warn!("Poller: {} fetch failed: {} ({:?})", kind.name(), e, e);
            state.error = Some(kind.failure_message().to_string());
        }
    }
}
