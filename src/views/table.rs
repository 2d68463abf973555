//! Alert table projection.

use crate::model::{AlertRecord, Severity};
use crate::poller::PollSnapshot;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Most rows the table shows at once.
pub const TABLE_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub id: String,
    pub severity: &'static str,
    pub severity_style: &'static str,
    pub source_ip: String,
    pub score: f64,
    pub alert_type: String,
    pub timestamp: String,
}

impl TableRow {
    fn from_alert(alert: &AlertRecord) -> Self {
        let severity = Severity::classify(alert.score);
        Self {
            id: alert.id.clone(),
            severity: severity.label(),
            severity_style: severity.style(),
            source_ip: alert.source_ip.clone(),
            score: alert.score,
            alert_type: alert
                .alert_type
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            timestamp: format_timestamp(alert),
        }
    }
}

/// Summary counters shown above the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub total: usize,
    pub critical: usize,
    pub average_score: i64,
}

pub fn summarize(alerts: &[AlertRecord]) -> TableSummary {
    let total = alerts.len();
    let critical = alerts
        .iter()
        .filter(|a| Severity::classify(a.score) == Severity::Critical)
        .count();
    let average_score = if total == 0 {
        0
    } else {
        let sum: f64 = alerts.iter().map(|a| a.score).sum();
        (sum / total as f64).round() as i64
    };

    TableSummary {
        total,
        critical,
        average_score,
    }
}

/// Render a timestamp for display, falling back to the raw text.
pub fn format_timestamp(alert: &AlertRecord) -> String {
    alert
        .parsed_timestamp()
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| alert.timestamp.clone())
}

/// Everything the page needs to draw the alert table.
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub rows: Vec<TableRow>,
    pub summary: TableSummary,
    pub footer: String,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TableView {
    /// Project a table poller snapshot (already newest first).
    pub fn from_snapshot(snapshot: &PollSnapshot) -> Self {
        let alerts = &snapshot.alerts;
        let rows: Vec<TableRow> = alerts
            .iter()
            .take(TABLE_PAGE_SIZE)
            .map(TableRow::from_alert)
            .collect();
        let footer = format!("Showing {} of {} alerts", rows.len(), alerts.len());

        Self {
            rows,
            summary: summarize(alerts),
            footer,
            loading: snapshot.loading,
            error: snapshot.error.clone(),
            last_updated: snapshot.last_updated,
        }
    }
}
