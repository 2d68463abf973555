//! Alert records as served by the scoring backend.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Severity bucket derived from an anomaly score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Bucket a score. Total over every `f64`: anything below 40 (NaN
    /// included) is `Low`, anything at or above 90 is `Critical`.
    pub fn classify(score: f64) -> Self {
        if score >= 90.0 {
            Severity::Critical
        } else if score >= 70.0 {
            Severity::High
        } else if score >= 40.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// CSS class used by the page for this bucket.
    pub fn style(self) -> &'static str {
        match self {
            Severity::Low => "severity-low",
            Severity::Medium => "severity-medium",
            Severity::High => "severity-high",
            Severity::Critical => "severity-critical",
        }
    }
}

/// A single alert as returned by `GET /alerts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub source_ip: String,
    pub score: f64,
    /// ISO-8601 timestamp, kept as sent. Records stored by the scoring
    /// backend carry none; those read as empty and sort earliest.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Either free text or the feature dictionary the backend attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AlertRecord {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    pub fn classify(&self) -> Severity {
        Severity::classify(self.score)
    }
}

/// Parse an RFC 3339 timestamp. Timestamps without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Ordering applied to a freshly fetched collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first (chart).
    Ascending,
    /// Newest first (table).
    Descending,
}

/// Sort alerts by timestamp. Unparseable timestamps count as the earliest
/// instant; equal keys keep fetch order.
pub fn sort_alerts(alerts: &mut [AlertRecord], order: SortOrder) {
    alerts.sort_by(|a, b| compare_by_time(a, b, order));
}

/// Compare two alerts by timestamp in the given order.
pub fn compare_by_time(a: &AlertRecord, b: &AlertRecord, order: SortOrder) -> Ordering {
    let (ka, kb) = (a.parsed_timestamp(), b.parsed_timestamp());
    match order {
        SortOrder::Ascending => ka.cmp(&kb),
        SortOrder::Descending => kb.cmp(&ka),
    }
}
