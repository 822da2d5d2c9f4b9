use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of evaluating a single condition inside a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionResult {
    /// Whether the condition passed.
    pub passed: bool,
    /// Why the condition passed or failed (e.g. `"label severity equals
    /// critical"`, `"invalid_regex"`).
    pub reason: String,
}

/// Per-rule evaluation record retained in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub rule_id: String,
    pub rule_name: String,
    /// Whether the rule matched the alert.
    pub matched: bool,
    /// One entry per evaluated condition. Evaluation short-circuits on
    /// the first failure, so this may be shorter than the rule's
    /// condition list; the last entry records the stopping reason.
    pub condition_results: Vec<ConditionResult>,
    /// Outcome of the time condition, when the rule has one.
    pub time_condition_matched: Option<bool>,
    /// Why the time condition passed or failed.
    pub time_condition_reason: Option<String>,
}

/// Record of one action execution attempt sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionExecution {
    /// Action tag, e.g. `"notify_team"`.
    pub action_type: String,
    /// When the first attempt started.
    pub started_at: DateTime<Utc>,
    /// Total wall-clock time across attempts, in milliseconds.
    pub duration_ms: u64,
    /// Whether the action ultimately succeeded.
    pub success: bool,
    /// The final error message, when the action failed.
    pub error_message: Option<String>,
    /// Whether the final error was retryable.
    pub retryable: bool,
    /// Notification ids produced by the handler (ticket ids for
    /// `create_ticket`).
    #[serde(default)]
    pub notification_ids: Vec<String>,
}

/// The per-alert record emitted by the routing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// Unique record identifier.
    pub id: String,
    /// The routed alert's id.
    pub alert_id: String,
    /// When routing ran.
    pub timestamp: DateTime<Utc>,
    /// One entry per evaluated rule, in priority order.
    pub evaluations: Vec<RuleEvaluation>,
    /// One entry per executed action, in execution order.
    pub executions: Vec<ActionExecution>,
    /// Opaque snapshot of the alert as routed.
    pub alert_snapshot: serde_json::Value,
}

impl AuditLog {
    /// Create an empty audit record for an alert at time `timestamp`.
    #[must_use]
    pub fn new(alert_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_id: alert_id.into(),
            timestamp,
            evaluations: Vec::new(),
            executions: Vec::new(),
            alert_snapshot: serde_json::Value::Null,
        }
    }

    /// Rules that matched, in priority order.
    #[must_use]
    pub fn matched_rules(&self) -> Vec<&RuleEvaluation> {
        self.evaluations.iter().filter(|e| e.matched).collect()
    }
}

/// Filter for querying persisted audit logs.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Restrict to a single alert.
    pub alert_id: Option<String>,
    /// Restrict to logs where the given rule was evaluated.
    pub rule_id: Option<String>,
    /// Only logs with at least one matched rule.
    #[serde(default)]
    pub matched_only: bool,
    /// Inclusive lower bound on `timestamp`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `timestamp`.
    pub until: Option<DateTime<Utc>>,
}
