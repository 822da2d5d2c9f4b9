//! Request/response shapes shared across API modules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use siren_core::{Alert, AlertSource, AlertStatus, Severity};
use siren_store::PageRequest;

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_token: Option<String>,
}

impl PageQuery {
    /// Convert to the store-level page request.
    #[must_use]
    pub fn to_page_request(&self) -> PageRequest {
        PageRequest {
            page_size: self.page_size.unwrap_or(0),
            page_token: self.page_token.clone(),
        }
    }
}

/// An alert as submitted by callers of the routing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRequest {
    pub fingerprint: String,
    pub summary: String,
    pub severity: Severity,
    pub source: AlertSource,
    #[serde(default)]
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl AlertRequest {
    /// Materialise the alert with a server-assigned id.
    #[must_use]
    pub fn into_alert(self) -> Alert {
        let mut alert = Alert::new(self.fingerprint, self.summary, self.source, self.severity)
            .with_labels(self.labels);
        alert.annotations = self.annotations;
        if let Some(status) = self.status {
            alert = alert.with_status(status);
        }
        alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_request_materialises() {
        let req: AlertRequest = serde_json::from_value(serde_json::json!({
            "fingerprint": "fp-1",
            "summary": "disk full",
            "severity": "critical",
            "source": "prometheus",
            "labels": {"site": "us-east-1"}
        }))
        .unwrap();
        let alert = req.into_alert();
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.status, AlertStatus::Firing);
        assert_eq!(alert.label("site"), Some("us-east-1"));
        assert!(!alert.id.is_empty());
    }

    #[test]
    fn page_query_defaults() {
        let q = PageQuery::default();
        let page = q.to_page_request();
        assert_eq!(page.effective_size(), 50);
    }
}
