//! Score-over-time chart projection.

use crate::model::AlertRecord;
use crate::poller::PollSnapshot;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SERIES_LABEL: &str = "Anomaly Score";

/// One line series: x labels and y values, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: &'static str,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl ChartSeries {
    pub fn from_alerts(alerts: &[AlertRecord]) -> Self {
        Self {
            label: SERIES_LABEL,
            labels: alerts.iter().map(point_label).collect(),
            data: alerts.iter().map(|a| a.score).collect(),
        }
    }
}

/// `HH:MM` of the alert, or the raw timestamp when it cannot be parsed.
fn point_label(alert: &AlertRecord) -> String {
    alert
        .parsed_timestamp()
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|| alert.timestamp.clone())
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub series: ChartSeries,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ChartView {
    /// Project a chart poller snapshot (already oldest first).
    pub fn from_snapshot(snapshot: &PollSnapshot) -> Self {
        Self {
            series: ChartSeries::from_alerts(&snapshot.alerts),
            loading: snapshot.loading,
            error: snapshot.error.clone(),
            last_updated: snapshot.last_updated,
        }
    }
}
