//! Dataset catalog entries.

use serde::{Deserialize, Serialize};

/// A selectable dataset as listed by `GET /external-dataset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub record_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl DatasetDescriptor {
    fn sample(id: &str, name: &str, description: &str, record_count: u64, last_updated: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            record_count,
            last_updated: Some(last_updated.to_string()),
        }
    }
}

/// Built-in catalog shown when the backend catalog cannot be fetched.
pub fn fallback_catalog() -> Vec<DatasetDescriptor> {
    vec![
        DatasetDescriptor::sample(
            "network-traffic",
            "Network Traffic Sample",
            "IoT network traffic patterns with labeled anomalies",
            5000,
            "2025-03-15",
        ),
        DatasetDescriptor::sample(
            "smart-home",
            "Smart Home Sensors",
            "Data from connected home devices with security events",
            3200,
            "2025-04-01",
        ),
        DatasetDescriptor::sample(
            "industrial-iot",
            "Industrial IoT Metrics",
            "Factory sensor data with security incidents",
            8500,
            "2025-03-25",
        ),
    ]
}

/// Format a count with comma thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
