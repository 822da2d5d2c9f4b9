use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an alert as reported by the source system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Firing,
    Resolved,
    Acknowledged,
    Silenced,
}

/// The system that emitted an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    Prometheus,
    Grafana,
    Webhook,
    Email,
    Manual,
}

impl fmt::Display for AlertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Prometheus => "prometheus",
            Self::Grafana => "grafana",
            Self::Webhook => "webhook",
            Self::Email => "email",
            Self::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Ordered alert severity. The ordering is the comparison order used by
/// routing conditions: `Debug < Info < Warning < High < Critical`.
///
/// Deserialisation goes through [`FromStr`], so the `p1`..`p5` paging
/// aliases are accepted anywhere a severity arrives as JSON.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    High,
    Critical,
}

impl Severity {
    /// Apply an integer boost, saturating at the ends of the scale.
    /// Positive boosts move toward `Critical`.
    #[must_use]
    pub fn boosted(self, boost: i32) -> Self {
        let rank = self.rank().saturating_add(boost).clamp(0, 4);
        match rank {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warning,
            3 => Self::High,
            _ => Self::Critical,
        }
    }

    fn rank(self) -> i32 {
        match self {
            Self::Debug => 0,
            Self::Info => 1,
            Self::Warning => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Error returned when a severity string is not recognised.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown severity: {0:?}")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    /// Parse a severity name. Accepts the canonical names plus the
    /// `p1`..`p5` paging aliases, case-insensitively (`p1` = critical).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "p5" => Ok(Self::Debug),
            "info" | "p4" => Ok(Self::Info),
            "warning" | "warn" | "p3" => Ok(Self::Warning),
            "high" | "error" | "p2" => Ok(Self::High),
            "critical" | "p1" => Ok(Self::Critical),
            other => Err(ParseSeverityError(other.to_owned())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = ParseSeverityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// An alert flowing through the routing pipeline.
///
/// Alerts are immutable once constructed; enrichment and label rewrites
/// happen on copies owned by the pipeline, never in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier.
    pub id: String,

    /// Stable hash of alert-identifying fields, used to correlate
    /// repeated events for the same underlying condition.
    pub fingerprint: String,

    /// Human-readable one-line summary.
    pub summary: String,

    /// Current lifecycle status.
    pub status: AlertStatus,

    /// The system that emitted the alert.
    pub source: AlertSource,

    /// Severity of the alert.
    pub severity: Severity,

    /// Key-value labels carried by the alert.
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Free-form annotations (runbooks, dashboards, descriptions).
    #[serde(default)]
    pub annotations: HashMap<String, String>,

    /// When the alert was created.
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Create a new firing alert with a generated id and `created_at` now.
    #[must_use]
    pub fn new(
        fingerprint: impl Into<String>,
        summary: impl Into<String>,
        source: AlertSource,
        severity: Severity,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fingerprint: fingerprint.into(),
            summary: summary.into(),
            status: AlertStatus::Firing,
            source,
            severity,
            labels: HashMap::new(),
            annotations: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Add a single label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Replace the label map.
    #[must_use]
    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// Add a single annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Set the lifecycle status.
    #[must_use]
    pub fn with_status(mut self, status: AlertStatus) -> Self {
        self.status = status;
        self
    }

    /// Look up a label value.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Look up an annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_parse_aliases() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("P1".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("p5".parse::<Severity>().unwrap(), Severity::Debug);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn severity_json_accepts_aliases() {
        let sev: Severity = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(sev, Severity::Critical);
        let sev: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(sev, Severity::High);
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert!(serde_json::from_str::<Severity>("\"sev0\"").is_err());
    }

    #[test]
    fn severity_boost_saturates() {
        assert_eq!(Severity::High.boosted(1), Severity::Critical);
        assert_eq!(Severity::High.boosted(5), Severity::Critical);
        assert_eq!(Severity::Info.boosted(-3), Severity::Debug);
        assert_eq!(Severity::Warning.boosted(0), Severity::Warning);
    }

    #[test]
    fn alert_builder() {
        let alert = Alert::new("fp-1", "disk full", AlertSource::Prometheus, Severity::High)
            .with_label("site", "us-east-1")
            .with_annotation("runbook", "https://wiki/disk");
        assert_eq!(alert.status, AlertStatus::Firing);
        assert_eq!(alert.label("site"), Some("us-east-1"));
        assert_eq!(alert.annotation("runbook"), Some("https://wiki/disk"));
        assert!(alert.label("missing").is_none());
    }

    #[test]
    fn alert_serde_roundtrip() {
        let alert = Alert::new("fp-2", "link down", AlertSource::Webhook, Severity::Critical)
            .with_label("device", "rtr-nyc-01");
        let json = serde_json::to_string(&alert).unwrap();
        let back: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, alert.id);
        assert_eq!(back.severity, Severity::Critical);
        assert_eq!(back.label("device"), Some("rtr-nyc-01"));
    }
}
