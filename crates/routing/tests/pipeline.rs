//! End-to-end tests of the routing pipeline against the in-memory
//! stores.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use siren_core::{
    Action, Alert, AlertSource, Condition, ConditionOp, MaintenanceAction, MaintenanceWindow,
    NotifyScope, RoutingRule, Severity,
};
use siren_maintenance::MaintenanceEvaluator;
use siren_routing::{
    AlertRouter, HandlerDeps, LogNotifier, RecordingNotifier, default_registry,
};
use siren_store::{
    AuditLogStore as _, MaintenanceWindowStore as _, PageRequest, RoutingRuleStore as _,
};
use siren_store_memory::{
    InMemoryAuditLogStore, InMemoryMaintenanceWindowStore, InMemoryRoutingRuleStore,
    InMemoryScheduleStore,
};

struct Fixture {
    router: AlertRouter,
    rules: Arc<InMemoryRoutingRuleStore>,
    audit: Arc<InMemoryAuditLogStore>,
    windows: Arc<InMemoryMaintenanceWindowStore>,
    notifier: Arc<RecordingNotifier>,
}

fn fixture() -> Fixture {
    let rules = Arc::new(InMemoryRoutingRuleStore::new());
    let audit = Arc::new(InMemoryAuditLogStore::new());
    let windows = Arc::new(InMemoryMaintenanceWindowStore::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let registry = default_registry(HandlerDeps {
        dispatcher: notifier.clone(),
        sink: Arc::new(LogNotifier),
        launcher: Arc::new(LogNotifier),
        tickets: Arc::new(LogNotifier),
        schedules: Arc::new(InMemoryScheduleStore::new()),
    });

    let router = AlertRouter::builder()
        .rules(rules.clone())
        .audit(audit.clone())
        .registry(registry)
        .maintenance(Arc::new(MaintenanceEvaluator::new(windows.clone())))
        .build()
        .unwrap();

    Fixture {
        router,
        rules,
        audit,
        windows,
        notifier,
    }
}

fn critical_alert() -> Alert {
    Alert::new("fp-1", "db down", AlertSource::Prometheus, Severity::Critical)
        .with_label("severity", "critical")
}

#[tokio::test]
async fn severity_gated_notify() {
    let f = fixture();
    f.rules
        .create(
            RoutingRule::new("critical-to-ops", 1)
                .with_condition(Condition::Label {
                    field: "severity".into(),
                    op: ConditionOp::Equals,
                    value: "critical".into(),
                })
                .with_action(Action::NotifyTeam {
                    team_id: "ops".into(),
                    scope: NotifyScope::Oncall,
                    template_id: None,
                }),
        )
        .await
        .unwrap();

    let response = f.router.route_alert(critical_alert()).await.unwrap();

    assert!(!response.suppressed);
    assert_eq!(response.audit_log.evaluations.len(), 1);
    assert!(response.audit_log.evaluations[0].matched);
    assert_eq!(response.audit_log.executions.len(), 1);
    assert!(response.audit_log.executions[0].success);
    assert_eq!(response.notification_ids.len(), 1);
    assert_eq!(f.notifier.sent.len(), 1);
}

#[tokio::test]
async fn suppress_wins_for_known_issue() {
    let f = fixture();
    f.rules
        .create(
            RoutingRule::new("known-issue", 1)
                .with_condition(Condition::Label {
                    field: "known_issue".into(),
                    op: ConditionOp::Equals,
                    value: "true".into(),
                })
                .with_action(Action::Suppress {
                    reason: "Known issue - auto suppressed".into(),
                    duration_seconds: None,
                    log_suppression: true,
                }),
        )
        .await
        .unwrap();

    let alert = Alert::new("fp-2", "flapping", AlertSource::Webhook, Severity::Warning)
        .with_label("known_issue", "true");
    let response = f.router.route_alert(alert).await.unwrap();

    assert!(response.suppressed);
    assert_eq!(
        response.suppression_reason.as_deref(),
        Some("Known issue - auto suppressed")
    );
    assert_eq!(response.audit_log.executions.len(), 1);
    assert!(response.audit_log.executions[0].success);
}

#[tokio::test]
async fn rules_evaluate_in_priority_order_and_union_actions() {
    let f = fixture();
    f.rules
        .create(
            RoutingRule::new("later", 20).with_action(Action::NotifyChannel {
                target: "#catchall".into(),
                template_id: None,
            }),
        )
        .await
        .unwrap();
    f.rules
        .create(
            RoutingRule::new("first", 1).with_action(Action::NotifyChannel {
                target: "#priority".into(),
                template_id: None,
            }),
        )
        .await
        .unwrap();

    let response = f.router.route_alert(critical_alert()).await.unwrap();

    let names: Vec<&str> = response
        .audit_log
        .evaluations
        .iter()
        .map(|e| e.rule_name.as_str())
        .collect();
    assert_eq!(names, vec!["first", "later"]);
    // Both rules matched; notifications preserve rule order.
    assert_eq!(response.notification_ids.len(), 2);
    assert_eq!(response.audit_log.executions.len(), 2);
}

#[tokio::test]
async fn maintenance_suppress_short_circuits_routing() {
    let f = fixture();
    f.rules
        .create(
            RoutingRule::new("noisy", 1).with_action(Action::NotifyChannel {
                target: "#alerts".into(),
                template_id: None,
            }),
        )
        .await
        .unwrap();

    let now = Utc::now();
    f.windows
        .create(
            MaintenanceWindow::new(
                "core upgrade",
                now - Duration::minutes(5),
                now + Duration::minutes(55),
                MaintenanceAction::Suppress,
            )
            .with_sites(vec!["us-east-1".into()]),
        )
        .await
        .unwrap();

    let alert = critical_alert().with_label("site", "us-east-1");
    let response = f.router.route_alert(alert).await.unwrap();

    assert!(response.suppressed);
    assert!(response.in_maintenance);
    assert_eq!(response.maintenance_window_ids.len(), 1);
    // No rule ran and nothing was notified.
    assert!(response.audit_log.evaluations.is_empty());
    assert!(f.notifier.sent.is_empty());
    assert!(
        response
            .suppression_reason
            .as_deref()
            .is_some_and(|r| r.contains("core upgrade"))
    );
}

#[tokio::test]
async fn notify_only_window_flags_but_routes() {
    let f = fixture();
    f.rules
        .create(
            RoutingRule::new("noisy", 1).with_action(Action::NotifyChannel {
                target: "#alerts".into(),
                template_id: None,
            }),
        )
        .await
        .unwrap();

    let now = Utc::now();
    f.windows
        .create(MaintenanceWindow::new(
            "observe only",
            now - Duration::minutes(5),
            now + Duration::minutes(55),
            MaintenanceAction::NotifyOnly,
        ))
        .await
        .unwrap();

    let response = f.router.route_alert(critical_alert()).await.unwrap();
    assert!(response.in_maintenance);
    assert!(!response.suppressed);
    assert_eq!(response.notification_ids.len(), 1);
}

#[tokio::test]
async fn match_counters_and_audit_are_persisted() {
    let f = fixture();
    let rule = f
        .rules
        .create(
            RoutingRule::new("counter", 1).with_action(Action::NotifyChannel {
                target: "#alerts".into(),
                template_id: None,
            }),
        )
        .await
        .unwrap();

    f.router.route_alert(critical_alert()).await.unwrap();
    f.router.route_alert(critical_alert()).await.unwrap();

    let stored = f.rules.get(&rule.id).await.unwrap();
    assert_eq!(stored.match_count, 2);
    assert!(stored.last_matched_at.is_some());

    let logs = f
        .audit
        .query(&siren_core::AuditQuery::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(logs.items.len(), 2);
}

#[tokio::test]
async fn simulate_warns_and_never_notifies() {
    let f = fixture();

    // Empty rule set warns.
    let result = f
        .router
        .simulate(critical_alert(), false, None)
        .await
        .unwrap();
    assert!(result.warnings.iter().any(|w| w == "no rules defined"));

    // A non-matching rule set warns differently.
    f.rules
        .create(
            RoutingRule::new("never", 1).with_condition(Condition::Label {
                field: "absent".into(),
                op: ConditionOp::Equals,
                value: "x".into(),
            }),
        )
        .await
        .unwrap();
    let result = f
        .router
        .simulate(critical_alert(), false, None)
        .await
        .unwrap();
    assert!(result.warnings.iter().any(|w| w == "no rules matched"));
    assert!(result.matched_actions.is_empty());
    assert!(f.notifier.sent.is_empty());
}

#[tokio::test]
async fn simulate_includes_disabled_rules_on_request() {
    let f = fixture();
    f.rules
        .create(
            RoutingRule::new("dormant", 1)
                .with_enabled(false)
                .with_action(Action::NotifyChannel {
                    target: "#alerts".into(),
                    template_id: None,
                }),
        )
        .await
        .unwrap();

    let without = f
        .router
        .simulate(critical_alert(), false, None)
        .await
        .unwrap();
    assert!(without.evaluations.is_empty());

    let with = f
        .router
        .simulate(critical_alert(), true, None)
        .await
        .unwrap();
    assert_eq!(with.evaluations.len(), 1);
    assert_eq!(with.matched_actions.len(), 1);
}

#[tokio::test]
async fn simulate_surfaces_cel_compile_errors_as_warnings() {
    let f = fixture();
    f.rules
        .create(RoutingRule::new("broken-cel", 1).with_cel("alert_labels["))
        .await
        .unwrap();

    let result = f
        .router
        .simulate(critical_alert(), false, None)
        .await
        .unwrap();
    assert!(result.warnings.iter().any(|w| w.contains("broken-cel")));
    assert!(!result.evaluations[0].matched);
}

#[tokio::test]
async fn test_rule_is_pure_and_reports_conditions() {
    let f = fixture();
    let rule = RoutingRule::new("adhoc", 1)
        .with_condition(Condition::Severity {
            op: ConditionOp::Ge,
            value: Severity::High,
        })
        .with_action(Action::NotifyChannel {
            target: "#alerts".into(),
            template_id: None,
        });

    let result = f
        .router
        .test_rule(&rule, critical_alert(), None)
        .unwrap();
    assert!(result.matched);
    assert_eq!(result.condition_results.len(), 1);
    assert_eq!(result.matched_actions.len(), 1);

    // Nothing was persisted or notified.
    let logs = f
        .audit
        .query(&siren_core::AuditQuery::default(), &PageRequest::default())
        .await
        .unwrap();
    assert!(logs.items.is_empty());
    assert!(f.notifier.sent.is_empty());

    // Compile errors surface to the caller here.
    let broken = RoutingRule::new("broken", 2).with_cel("==");
    assert!(f.router.test_rule(&broken, critical_alert(), None).is_err());
}

#[tokio::test]
async fn reorder_applies_batch_atomically() {
    let f = fixture();
    let a = f.rules.create(RoutingRule::new("a", 1)).await.unwrap();
    let b = f.rules.create(RoutingRule::new("b", 2)).await.unwrap();

    let updated = f
        .router
        .reorder_rules(&HashMap::from([(a.id.clone(), 2), (b.id.clone(), 1)]))
        .await
        .unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(f.rules.get(&b.id).await.unwrap().priority, 1);
    assert_eq!(f.rules.get(&a.id).await.unwrap().priority, 2);

    // A conflicting batch changes nothing.
    let err = f
        .router
        .reorder_rules(&HashMap::from([(a.id.clone(), 1)]))
        .await;
    assert!(err.is_err());
    assert_eq!(f.rules.get(&a.id).await.unwrap().priority, 2);
}

#[tokio::test]
async fn evaluation_is_deterministic_across_calls() {
    let f = fixture();
    f.rules
        .create(
            RoutingRule::new("gate", 1)
                .with_condition(Condition::Label {
                    field: "severity".into(),
                    op: ConditionOp::In,
                    value: "high,critical".into(),
                })
                .with_action(Action::NotifyChannel {
                    target: "#alerts".into(),
                    template_id: None,
                }),
        )
        .await
        .unwrap();

    let fixed = Utc::now();
    let first = f
        .router
        .simulate(critical_alert(), false, Some(fixed))
        .await
        .unwrap();
    let second = f
        .router
        .simulate(critical_alert(), false, Some(fixed))
        .await
        .unwrap();

    assert_eq!(first.evaluations.len(), second.evaluations.len());
    assert_eq!(
        first.evaluations[0].matched,
        second.evaluations[0].matched
    );
    assert_eq!(first.matched_actions.len(), second.matched_actions.len());
}
