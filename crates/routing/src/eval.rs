//! Rule and condition evaluation.
//!
//! Evaluation is pure over a [`RouteContext`]: the same rules, alert,
//! and instant always produce the same evaluations and matched actions.
//! Condition-level errors (bad regex, bad CEL) degrade to a failed
//! [`ConditionResult`] with the failure recorded as the reason.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

use siren_cel::ProgramCache;
use siren_core::{
    Action, AlertSource, Condition, ConditionOp, ConditionResult, RoutingRule, RuleEvaluation,
    Severity, TimeCondition,
};

use crate::context::RouteContext;

/// The result of evaluating a rule set against one alert.
#[derive(Debug, Clone, Default)]
pub struct EvaluationOutcome {
    /// One record per evaluated rule, in priority order.
    pub evaluations: Vec<RuleEvaluation>,
    /// The union of matched rules' actions, preserving rule order.
    pub matched_actions: Vec<Action>,
    /// Ids of the rules that matched, in priority order.
    pub matched_rule_ids: Vec<String>,
}

/// Evaluate `rules` (already in priority order) against the context.
///
/// Matching one rule never stops evaluation of later rules; a
/// `suppress` action is recorded like any other and the loop continues.
#[must_use]
pub fn evaluate_rules(
    rules: &[RoutingRule],
    ctx: &RouteContext,
    cel: &ProgramCache,
) -> EvaluationOutcome {
    let mut outcome = EvaluationOutcome::default();
    for rule in rules {
        let evaluation = evaluate_rule(rule, ctx, cel);
        if evaluation.matched {
            debug!(rule = %rule.name, alert = %ctx.alert.id, "rule matched");
            outcome.matched_actions.extend(rule.actions.iter().cloned());
            outcome.matched_rule_ids.push(rule.id.clone());
        }
        outcome.evaluations.push(evaluation);
    }
    outcome
}

/// Evaluate a single rule.
///
/// Conditions are AND-combined and short-circuit on the first failure;
/// the failing result still records the stopping reason. The time
/// condition and the rule-level CEL expression are further conjuncts.
#[must_use]
pub fn evaluate_rule(rule: &RoutingRule, ctx: &RouteContext, cel: &ProgramCache) -> RuleEvaluation {
    let mut condition_results = Vec::new();
    let mut all_passed = true;

    for condition in &rule.conditions {
        let result = evaluate_condition(condition, rule, ctx, cel);
        let passed = result.passed;
        condition_results.push(result);
        if !passed {
            all_passed = false;
            break;
        }
    }

    // The time condition gates the rule even when attached without a
    // TimeWindow condition in the list.
    let (time_matched, time_reason) = match &rule.time_condition {
        Some(tc) => {
            let (matched, reason) = time_condition_contains(tc, ctx.now);
            (Some(matched), Some(reason))
        }
        None => (None, None),
    };

    let mut matched = all_passed && time_matched.unwrap_or(true);

    // Rule-level CEL expression, evaluated only when still matching.
    if matched && let Some(ref expr) = rule.cel_expression {
        let result = evaluate_cel(expr, ctx, cel);
        matched = result.passed;
        condition_results.push(result);
    }

    RuleEvaluation {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        matched,
        condition_results,
        time_condition_matched: time_matched,
        time_condition_reason: time_reason,
    }
}

/// Evaluate one condition against the context.
#[must_use]
pub fn evaluate_condition(
    condition: &Condition,
    rule: &RoutingRule,
    ctx: &RouteContext,
    cel: &ProgramCache,
) -> ConditionResult {
    match condition {
        Condition::Label { field, op, value } => {
            string_field_condition("label", field, ctx.alert.label(field), *op, value)
        }
        Condition::Annotation { field, op, value } => string_field_condition(
            "annotation",
            field,
            ctx.alert.annotation(field),
            *op,
            value,
        ),
        Condition::Severity { op, value } => severity_condition(ctx.effective_severity(), *op, *value),
        Condition::Source { op, value } => source_condition(ctx.alert.source, *op, *value),
        Condition::TimeWindow => match &rule.time_condition {
            Some(tc) => {
                let (passed, reason) = time_condition_contains(tc, ctx.now);
                ConditionResult { passed, reason }
            }
            None => ConditionResult {
                passed: false,
                reason: "no time window configured on rule".into(),
            },
        },
        Condition::Cel { expr } => evaluate_cel(expr, ctx, cel),
    }
}

fn evaluate_cel(expr: &str, ctx: &RouteContext, cel: &ProgramCache) -> ConditionResult {
    match cel.get_or_compile(expr) {
        Ok(program) => match program.eval_bool(&ctx.activation()) {
            Ok(true) => ConditionResult {
                passed: true,
                reason: "cel expression matched".into(),
            },
            Ok(false) => ConditionResult {
                passed: false,
                reason: "cel expression did not match".into(),
            },
            Err(e) => ConditionResult {
                passed: false,
                reason: format!("cel evaluation failed: {e}"),
            },
        },
        Err(e) => ConditionResult {
            passed: false,
            reason: format!("invalid_cel: {e}"),
        },
    }
}

/// Apply a string operator to an optional label/annotation value.
///
/// Missing fields never satisfy positive operators; the negated
/// operators pass vacuously on a missing field.
fn string_field_condition(
    kind: &str,
    field: &str,
    actual: Option<&str>,
    op: ConditionOp,
    operand: &str,
) -> ConditionResult {
    let Some(actual) = actual else {
        let passed = matches!(
            op,
            ConditionOp::NotEquals | ConditionOp::NotContains | ConditionOp::NotIn
        );
        return ConditionResult {
            passed,
            reason: format!("{kind} {field} missing"),
        };
    };

    let (passed, reason) = match op {
        ConditionOp::Equals => (
            actual == operand,
            format!("{kind} {field}={actual:?} equals {operand:?}"),
        ),
        ConditionOp::NotEquals => (
            actual != operand,
            format!("{kind} {field}={actual:?} not_equals {operand:?}"),
        ),
        ConditionOp::Contains => (
            actual.contains(operand),
            format!("{kind} {field}={actual:?} contains {operand:?}"),
        ),
        ConditionOp::NotContains => (
            !actual.contains(operand),
            format!("{kind} {field}={actual:?} not_contains {operand:?}"),
        ),
        ConditionOp::MatchesRegex => match Regex::new(operand) {
            Ok(re) => (
                re.is_match(actual),
                format!("{kind} {field}={actual:?} matches_regex {operand:?}"),
            ),
            Err(_) => {
                return ConditionResult {
                    passed: false,
                    reason: "invalid_regex".into(),
                };
            }
        },
        ConditionOp::In => (
            membership(operand).any(|m| m == actual),
            format!("{kind} {field}={actual:?} in {operand:?}"),
        ),
        ConditionOp::NotIn => (
            !membership(operand).any(|m| m == actual),
            format!("{kind} {field}={actual:?} not_in {operand:?}"),
        ),
        ConditionOp::Gt | ConditionOp::Ge | ConditionOp::Lt | ConditionOp::Le => {
            return ConditionResult {
                passed: false,
                reason: format!("ordering operator not defined for {kind} conditions"),
            };
        }
    };
    let verdict = if passed { "passed" } else { "failed" };
    ConditionResult {
        passed,
        reason: format!("{reason}: {verdict}"),
    }
}

/// Split a comma-separated membership list.
fn membership(operand: &str) -> impl Iterator<Item = &str> {
    operand.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn severity_condition(actual: Severity, op: ConditionOp, operand: Severity) -> ConditionResult {
    let passed = match op {
        ConditionOp::Equals => actual == operand,
        ConditionOp::NotEquals => actual != operand,
        ConditionOp::Gt => actual > operand,
        ConditionOp::Ge => actual >= operand,
        ConditionOp::Lt => actual < operand,
        ConditionOp::Le => actual <= operand,
        ConditionOp::Contains
        | ConditionOp::NotContains
        | ConditionOp::MatchesRegex
        | ConditionOp::In
        | ConditionOp::NotIn => {
            return ConditionResult {
                passed: false,
                reason: format!("operator {op:?} not defined for severity conditions"),
            };
        }
    };
    let verdict = if passed { "passed" } else { "failed" };
    ConditionResult {
        passed,
        reason: format!("severity {actual} {op:?} {operand}: {verdict}"),
    }
}

fn source_condition(actual: AlertSource, op: ConditionOp, operand: AlertSource) -> ConditionResult {
    let passed = match op {
        ConditionOp::Equals => actual == operand,
        ConditionOp::NotEquals => actual != operand,
        _ => {
            return ConditionResult {
                passed: false,
                reason: format!("operator {op:?} not defined for source conditions"),
            };
        }
    };
    let verdict = if passed { "passed" } else { "failed" };
    ConditionResult {
        passed,
        reason: format!("source {actual} {op:?} {operand}: {verdict}"),
    }
}

/// Whether `t` falls inside the recurring window, evaluated in the
/// window's timezone. A window whose end is at or before its start
/// wraps past midnight.
fn time_condition_contains(tc: &TimeCondition, t: DateTime<Utc>) -> (bool, String) {
    let Ok(tz) = tc.timezone.parse::<Tz>() else {
        return (false, format!("invalid timezone {:?}", tc.timezone));
    };
    let local = t.with_timezone(&tz);

    if !tc.days.is_empty() && !tc.days.contains(&local.weekday()) {
        return (
            false,
            format!("{} is outside the window days", local.weekday()),
        );
    }

    let tod = local.time();
    let inside = if tc.end <= tc.start {
        // Overnight window, e.g. 22:00-06:00.
        tod >= tc.start || tod < tc.end
    } else {
        tod >= tc.start && tod < tc.end
    };
    if inside {
        (true, format!("{tod} inside {}-{}", tc.start, tc.end))
    } else {
        (false, format!("{tod} outside {}-{}", tc.start, tc.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use siren_core::{Alert, AlertSource, NotifyScope};

    fn ctx_with_labels(pairs: &[(&str, &str)]) -> RouteContext {
        let mut alert = Alert::new("fp", "x", AlertSource::Prometheus, Severity::Critical);
        for (k, v) in pairs {
            alert = alert.with_label(*k, *v);
        }
        RouteContext::new(alert, Utc::now())
    }

    fn bare_rule() -> RoutingRule {
        RoutingRule::new("r", 1)
    }

    fn eval_one(condition: Condition, ctx: &RouteContext) -> ConditionResult {
        evaluate_condition(&condition, &bare_rule(), ctx, &ProgramCache::new())
    }

    #[test]
    fn label_equals() {
        let ctx = ctx_with_labels(&[("severity", "critical")]);
        let r = eval_one(
            Condition::Label {
                field: "severity".into(),
                op: ConditionOp::Equals,
                value: "critical".into(),
            },
            &ctx,
        );
        assert!(r.passed);
    }

    #[test]
    fn missing_label_fails_positive_passes_negative() {
        let ctx = ctx_with_labels(&[]);
        let positive = eval_one(
            Condition::Label {
                field: "env".into(),
                op: ConditionOp::Equals,
                value: "prod".into(),
            },
            &ctx,
        );
        assert!(!positive.passed);
        assert!(positive.reason.contains("missing"));

        let negative = eval_one(
            Condition::Label {
                field: "env".into(),
                op: ConditionOp::NotEquals,
                value: "prod".into(),
            },
            &ctx,
        );
        assert!(negative.passed);
    }

    #[test]
    fn invalid_regex_records_reason() {
        let ctx = ctx_with_labels(&[("host", "db-1")]);
        let r = eval_one(
            Condition::Label {
                field: "host".into(),
                op: ConditionOp::MatchesRegex,
                value: "([".into(),
            },
            &ctx,
        );
        assert!(!r.passed);
        assert_eq!(r.reason, "invalid_regex");
    }

    #[test]
    fn in_membership_list() {
        let ctx = ctx_with_labels(&[("env", "staging")]);
        let r = eval_one(
            Condition::Label {
                field: "env".into(),
                op: ConditionOp::In,
                value: "prod, staging".into(),
            },
            &ctx,
        );
        assert!(r.passed);
    }

    #[test]
    fn ordering_ops_only_for_severity() {
        let ctx = ctx_with_labels(&[("count", "5")]);
        let r = eval_one(
            Condition::Label {
                field: "count".into(),
                op: ConditionOp::Gt,
                value: "3".into(),
            },
            &ctx,
        );
        assert!(!r.passed);
        assert!(r.reason.contains("not defined"));

        let r = eval_one(
            Condition::Severity {
                op: ConditionOp::Ge,
                value: Severity::High,
            },
            &ctx,
        );
        assert!(r.passed);
    }

    #[test]
    fn severity_ordering_with_aliases() {
        let ctx = ctx_with_labels(&[]);
        // Alert severity is critical.
        let r = eval_one(
            Condition::Severity {
                op: ConditionOp::Gt,
                value: Severity::Warning,
            },
            &ctx,
        );
        assert!(r.passed);
        let r = eval_one(
            Condition::Severity {
                op: ConditionOp::Lt,
                value: Severity::High,
            },
            &ctx,
        );
        assert!(!r.passed);
    }

    #[test]
    fn source_condition_typed() {
        let ctx = ctx_with_labels(&[]);
        let r = eval_one(
            Condition::Source {
                op: ConditionOp::Equals,
                value: AlertSource::Prometheus,
            },
            &ctx,
        );
        assert!(r.passed);
        let r = eval_one(
            Condition::Source {
                op: ConditionOp::NotEquals,
                value: AlertSource::Manual,
            },
            &ctx,
        );
        assert!(r.passed);
    }

    #[test]
    fn time_window_without_config_fails() {
        let ctx = ctx_with_labels(&[]);
        let r = eval_one(Condition::TimeWindow, &ctx);
        assert!(!r.passed);
    }

    #[test]
    fn time_condition_business_hours() {
        let tc = TimeCondition {
            days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            timezone: "UTC".into(),
        };
        // 2024-01-03 is a Wednesday.
        let inside = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();
        let outside_hours = Utc.with_ymd_and_hms(2024, 1, 3, 20, 0, 0).unwrap();
        let weekend = Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap();
        assert!(time_condition_contains(&tc, inside).0);
        assert!(!time_condition_contains(&tc, outside_hours).0);
        assert!(!time_condition_contains(&tc, weekend).0);
    }

    #[test]
    fn time_condition_overnight_wrap() {
        let tc = TimeCondition {
            days: vec![],
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            timezone: "UTC".into(),
        };
        let late = Utc.with_ymd_and_hms(2024, 1, 3, 23, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 1, 3, 3, 0, 0).unwrap();
        let midday = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();
        assert!(time_condition_contains(&tc, late).0);
        assert!(time_condition_contains(&tc, early).0);
        assert!(!time_condition_contains(&tc, midday).0);
    }

    #[test]
    fn short_circuit_records_stopping_reason() {
        let rule = bare_rule()
            .with_condition(Condition::Label {
                field: "missing".into(),
                op: ConditionOp::Equals,
                value: "x".into(),
            })
            .with_condition(Condition::Severity {
                op: ConditionOp::Ge,
                value: Severity::Debug,
            });
        let ctx = ctx_with_labels(&[]);
        let eval = evaluate_rule(&rule, &ctx, &ProgramCache::new());
        assert!(!eval.matched);
        // Evaluation stopped at the first failing condition.
        assert_eq!(eval.condition_results.len(), 1);
        assert!(eval.condition_results[0].reason.contains("missing"));
    }

    #[test]
    fn rule_level_cel_gates_match() {
        let rule = bare_rule().with_cel(r#"alert_labels["env"] == "prod""#);
        let prod = ctx_with_labels(&[("env", "prod")]);
        let staging = ctx_with_labels(&[("env", "staging")]);
        let cache = ProgramCache::new();
        assert!(evaluate_rule(&rule, &prod, &cache).matched);
        assert!(!evaluate_rule(&rule, &staging, &cache).matched);
    }

    #[test]
    fn bad_cel_degrades_to_condition_fail() {
        let rule = bare_rule().with_cel("alert_labels[");
        let ctx = ctx_with_labels(&[]);
        let eval = evaluate_rule(&rule, &ctx, &ProgramCache::new());
        assert!(!eval.matched);
        assert!(
            eval.condition_results
                .last()
                .is_some_and(|r| r.reason.starts_with("invalid_cel"))
        );
    }

    #[test]
    fn matching_is_deterministic_and_order_preserving() {
        let first = RoutingRule::new("first", 1)
            .with_condition(Condition::Severity {
                op: ConditionOp::Ge,
                value: Severity::High,
            })
            .with_action(Action::NotifyTeam {
                team_id: "ops".into(),
                scope: NotifyScope::Oncall,
                template_id: None,
            });
        let second = RoutingRule::new("second", 2).with_action(Action::Suppress {
            reason: "blanket".into(),
            duration_seconds: None,
            log_suppression: false,
        });
        let rules = vec![first, second];
        let ctx = ctx_with_labels(&[]);
        let cache = ProgramCache::new();

        let a = evaluate_rules(&rules, &ctx, &cache);
        let b = evaluate_rules(&rules, &ctx, &cache);

        assert_eq!(a.matched_rule_ids, b.matched_rule_ids);
        assert_eq!(a.matched_actions.len(), 2);
        // A suppress in the first matched rule does not stop the loop.
        assert_eq!(a.evaluations.len(), 2);
        assert_eq!(a.matched_actions[0].tag(), "notify_team");
        assert_eq!(a.matched_actions[1].tag(), "suppress");
    }
}
