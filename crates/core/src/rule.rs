use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::{AlertSource, Severity};
use crate::action::Action;

/// Comparison operator used by routing conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    MatchesRegex,
    In,
    NotIn,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A predicate over a single alert field.
///
/// Conditions within a rule are AND-combined; a rule matches only when
/// every condition passes (and the time condition, if present, contains
/// the evaluation instant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Compare a label value.
    Label {
        field: String,
        op: ConditionOp,
        /// Comparison operand. For `in`/`not_in` this is a comma-separated
        /// membership list.
        value: String,
    },
    /// Compare an annotation value.
    Annotation {
        field: String,
        op: ConditionOp,
        value: String,
    },
    /// Compare the alert severity. Ordering operators are only defined
    /// for this variant.
    Severity { op: ConditionOp, value: Severity },
    /// Compare the alert source.
    Source { op: ConditionOp, value: AlertSource },
    /// Pass only inside the rule's [`TimeCondition`].
    TimeWindow,
    /// Evaluate a CEL expression against the alert activation.
    Cel { expr: String },
}

/// A recurring time-of-day window with an IANA timezone.
///
/// `start` and `end` are wall-clock times in `timezone`; a window whose
/// `end` is at or before `start` wraps past midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeCondition {
    /// Days of week on which the window opens (evaluated in `timezone`).
    pub days: Vec<Weekday>,
    /// Inclusive wall-clock start.
    pub start: NaiveTime,
    /// Exclusive wall-clock end.
    pub end: NaiveTime,
    /// IANA timezone name, e.g. `"America/New_York"`.
    pub timezone: String,
}

/// An ordered routing policy mapping matching alerts to a list of actions.
///
/// Rules are evaluated in ascending `priority` order (lower value =
/// evaluated first); ties are broken by `created_at`. The store keeps
/// priority values unique among enabled rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Unique rule identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Evaluation order. Lower values are evaluated first.
    pub priority: i32,
    /// Whether the rule participates in routing.
    pub enabled: bool,
    /// AND-combined conditions.
    pub conditions: Vec<Condition>,
    /// Actions executed when the rule matches, in order.
    pub actions: Vec<Action>,
    /// Optional recurring time window gating the rule.
    pub time_condition: Option<TimeCondition>,
    /// Optional CEL expression that must evaluate truthy for the rule to
    /// match, in addition to `conditions`.
    pub cel_expression: Option<String>,
    /// Number of alerts this rule has matched.
    #[serde(default)]
    pub match_count: u64,
    /// When the rule last matched an alert.
    pub last_matched_at: Option<DateTime<Utc>>,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
    /// When the rule was last updated.
    pub updated_at: DateTime<Utc>,
}

impl RoutingRule {
    /// Create a new enabled rule with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            priority,
            enabled: true,
            conditions: Vec::new(),
            actions: Vec::new(),
            time_condition: None,
            cel_expression: None,
            match_count: 0,
            last_matched_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append an action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the time condition.
    #[must_use]
    pub fn with_time_condition(mut self, tc: TimeCondition) -> Self {
        self.time_condition = Some(tc);
        self
    }

    /// Set the CEL expression.
    #[must_use]
    pub fn with_cel(mut self, expr: impl Into<String>) -> Self {
        self.cel_expression = Some(expr.into());
        self
    }

    /// Set the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
