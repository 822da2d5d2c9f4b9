use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use siren_cel::ProgramCache;
use siren_core::{
    Action, Alert, AuditLog, AuditQuery, ConditionResult, MaintenanceAction, RoutingRule,
    RuleEvaluation,
};
use siren_maintenance::{MaintenanceCheck, MaintenanceEvaluator};
use siren_resolver::{CustomerResolver, EquipmentResolver};
use siren_store::{AuditLogStore, Page, PageRequest, RoutingRuleStore};

use crate::context::RouteContext;
use crate::error::RoutingError;
use crate::eval::{evaluate_rule, evaluate_rules};
use crate::executor::{ActionExecutor, ExecutorConfig};
use crate::handlers::HandlerRegistry;

/// The outcome of routing one alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAlertResponse {
    pub suppressed: bool,
    pub suppression_reason: Option<String>,
    pub escalation_started: bool,
    pub escalation_id: Option<String>,
    pub notification_ids: Vec<String>,
    pub in_maintenance: bool,
    pub maintenance_window_ids: Vec<String>,
    /// Always present, even on partial failure.
    pub audit_log: AuditLog,
}

/// The outcome of a routing simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub evaluations: Vec<RuleEvaluation>,
    pub matched_actions: Vec<Action>,
    pub warnings: Vec<String>,
    pub maintenance: Option<MaintenanceCheck>,
}

/// The outcome of testing a single ad-hoc rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRuleResult {
    pub matched: bool,
    pub condition_results: Vec<ConditionResult>,
    pub time_condition_matched: Option<bool>,
    pub time_condition_reason: Option<String>,
    pub matched_actions: Vec<Action>,
}

/// The routing pipeline front door.
///
/// Owns the rule store, the audit store, the executor, the CEL program
/// cache, and the optional enrichment collaborators. Construct through
/// [`AlertRouterBuilder`].
pub struct AlertRouter {
    rules: Arc<dyn RoutingRuleStore>,
    audit: Arc<dyn AuditLogStore>,
    executor: ActionExecutor,
    simulation_executor: ActionExecutor,
    cel: ProgramCache,
    maintenance: Option<Arc<MaintenanceEvaluator>>,
    customers: Option<Arc<CustomerResolver>>,
    equipment: Option<Arc<EquipmentResolver>>,
}

/// Fluent builder for [`AlertRouter`].
///
/// The rule store, audit store, and handler registry are required; the
/// maintenance evaluator and resolvers are optional enrichment.
pub struct AlertRouterBuilder {
    rules: Option<Arc<dyn RoutingRuleStore>>,
    audit: Option<Arc<dyn AuditLogStore>>,
    registry: HandlerRegistry,
    executor_config: ExecutorConfig,
    cel_capacity: u64,
    maintenance: Option<Arc<MaintenanceEvaluator>>,
    customers: Option<Arc<CustomerResolver>>,
    equipment: Option<Arc<EquipmentResolver>>,
}

impl AlertRouterBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: None,
            audit: None,
            registry: HandlerRegistry::new(),
            executor_config: ExecutorConfig::default(),
            cel_capacity: siren_cel::cache::DEFAULT_CAPACITY,
            maintenance: None,
            customers: None,
            equipment: None,
        }
    }

    /// Set the rule store.
    #[must_use]
    pub fn rules(mut self, rules: Arc<dyn RoutingRuleStore>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set the audit log store.
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn AuditLogStore>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set the action handler registry.
    #[must_use]
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Override the executor configuration.
    #[must_use]
    pub fn executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    /// Bound the CEL program cache.
    #[must_use]
    pub fn cel_capacity(mut self, capacity: u64) -> Self {
        self.cel_capacity = capacity;
        self
    }

    /// Wire in the maintenance evaluator.
    #[must_use]
    pub fn maintenance(mut self, evaluator: Arc<MaintenanceEvaluator>) -> Self {
        self.maintenance = Some(evaluator);
        self
    }

    /// Wire in the customer resolver.
    #[must_use]
    pub fn customers(mut self, resolver: Arc<CustomerResolver>) -> Self {
        self.customers = Some(resolver);
        self
    }

    /// Wire in the equipment resolver.
    #[must_use]
    pub fn equipment(mut self, resolver: Arc<EquipmentResolver>) -> Self {
        self.equipment = Some(resolver);
        self
    }

    /// Build the router.
    ///
    /// Fails with [`RoutingError::Store`] when a required store is
    /// missing.
    pub fn build(self) -> Result<AlertRouter, RoutingError> {
        let rules = self.rules.ok_or_else(|| {
            RoutingError::Store(siren_store::StoreError::Invalid("rule store required".into()))
        })?;
        let audit = self.audit.ok_or_else(|| {
            RoutingError::Store(siren_store::StoreError::Invalid(
                "audit store required".into(),
            ))
        })?;
        Ok(AlertRouter {
            rules,
            audit,
            executor: ActionExecutor::new(self.registry, self.executor_config.clone()),
            simulation_executor: ActionExecutor::new(
                HandlerRegistry::recording(),
                self.executor_config,
            ),
            cel: ProgramCache::with_capacity(self.cel_capacity),
            maintenance: self.maintenance,
            customers: self.customers,
            equipment: self.equipment,
        })
    }
}

impl Default for AlertRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertRouter {
    /// Start building a router.
    #[must_use]
    pub fn builder() -> AlertRouterBuilder {
        AlertRouterBuilder::new()
    }

    /// Route one alert: maintenance check, enrichment, evaluation,
    /// action execution, audit.
    ///
    /// Always returns an audit log, even when action execution or audit
    /// persistence partially fails.
    #[instrument(skip_all, fields(alert = %alert.id, fingerprint = %alert.fingerprint))]
    pub async fn route_alert(&self, alert: Alert) -> Result<RouteAlertResponse, RoutingError> {
        let now = Utc::now();
        let mut audit_log = AuditLog::new(alert.id.clone(), now);
        audit_log.alert_snapshot = serde_json::to_value(&alert).unwrap_or_default();

        // Maintenance short-circuit: a matching Suppress window ends
        // routing before any rule runs.
        let maintenance = self.check_maintenance(&alert, now).await;
        let (in_maintenance, window_ids) = maintenance_flags(maintenance.as_ref());
        if let Some(ref check) = maintenance
            && check.recommended_action == Some(MaintenanceAction::Suppress)
        {
            let reason = check
                .matching_windows
                .first()
                .map_or_else(|| "maintenance window".to_owned(), |w| {
                    format!("maintenance window: {}", w.title)
                });
            debug!(alert = %alert.id, %reason, "alert suppressed by maintenance window");
            self.persist_audit(audit_log.clone()).await;
            return Ok(RouteAlertResponse {
                suppressed: true,
                suppression_reason: Some(reason),
                escalation_started: false,
                escalation_id: None,
                notification_ids: Vec::new(),
                in_maintenance: true,
                maintenance_window_ids: window_ids,
                audit_log,
            });
        }

        let ctx = self.enrich(alert, now).await;

        let rules = self.rules.list_enabled().await?;
        let outcome = evaluate_rules(&rules, &ctx, &self.cel);
        audit_log.evaluations = outcome.evaluations;

        let report = self.executor.execute(&outcome.matched_actions, &ctx).await;
        audit_log.executions = report.executions;

        for rule_id in &outcome.matched_rule_ids {
            if let Err(e) = self.rules.record_match(rule_id, now).await {
                warn!(rule = %rule_id, error = %e, "failed to record rule match");
            }
        }

        self.persist_audit(audit_log.clone()).await;

        Ok(RouteAlertResponse {
            suppressed: report.suppressed,
            suppression_reason: report.suppression_reason,
            escalation_started: report.escalation_started,
            escalation_id: report.escalation_id,
            notification_ids: report.notification_ids,
            in_maintenance,
            maintenance_window_ids: window_ids,
            audit_log,
        })
    }

    /// Run the evaluator with stub handlers and no persistence.
    ///
    /// CEL compile errors become warnings instead of failing the call.
    #[instrument(skip_all, fields(alert = %alert.id))]
    pub async fn simulate(
        &self,
        alert: Alert,
        include_disabled: bool,
        simulate_time: Option<DateTime<Utc>>,
    ) -> Result<SimulationResult, RoutingError> {
        let now = simulate_time.unwrap_or_else(Utc::now);
        let rules = if include_disabled {
            self.rules.list_all_ordered().await?
        } else {
            self.rules.list_enabled().await?
        };

        let mut warnings = Vec::new();
        if rules.is_empty() {
            warnings.push("no rules defined".to_owned());
        }
        for rule in &rules {
            for expr in rule_expressions(rule) {
                if let Err(e) = self.cel.get_or_compile(expr) {
                    warnings.push(format!("rule {:?}: {e}", rule.name));
                }
            }
        }

        let maintenance = self.check_maintenance(&alert, now).await;
        let ctx = self.enrich(alert, now).await;
        let outcome = evaluate_rules(&rules, &ctx, &self.cel);
        if outcome.matched_rule_ids.is_empty() && !rules.is_empty() {
            warnings.push("no rules matched".to_owned());
        }

        // Exercise the stub handlers so simulation covers the execution
        // path without side effects.
        let _ = self
            .simulation_executor
            .execute(&outcome.matched_actions, &ctx)
            .await;

        Ok(SimulationResult {
            evaluations: outcome.evaluations,
            matched_actions: outcome.matched_actions,
            warnings,
            maintenance,
        })
    }

    /// Evaluate a single ad-hoc rule against a sample alert without
    /// persistence or collaborators.
    ///
    /// Unlike live routing, CEL compile errors surface as errors here so
    /// rule authors see them immediately.
    pub fn test_rule(
        &self,
        rule: &RoutingRule,
        sample_alert: Alert,
        simulate_time: Option<DateTime<Utc>>,
    ) -> Result<TestRuleResult, RoutingError> {
        for expr in rule_expressions(rule) {
            self.cel.get_or_compile(expr)?;
        }

        let now = simulate_time.unwrap_or_else(Utc::now);
        let ctx = RouteContext::new(sample_alert, now);
        let evaluation = evaluate_rule(rule, &ctx, &self.cel);
        let matched_actions = if evaluation.matched {
            rule.actions.clone()
        } else {
            Vec::new()
        };
        Ok(TestRuleResult {
            matched: evaluation.matched,
            condition_results: evaluation.condition_results,
            time_condition_matched: evaluation.time_condition_matched,
            time_condition_reason: evaluation.time_condition_reason,
            matched_actions,
        })
    }

    /// Atomically apply a batch of priority changes.
    pub async fn reorder_rules(
        &self,
        priorities: &std::collections::HashMap<String, i32>,
    ) -> Result<Vec<RoutingRule>, RoutingError> {
        Ok(self.rules.reorder(priorities).await?)
    }

    /// Query persisted audit logs.
    pub async fn audit_logs(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> Result<Page<AuditLog>, RoutingError> {
        Ok(self.audit.query(query, page).await?)
    }

    /// Maintenance check; store failures degrade to "not in
    /// maintenance" with a log line rather than failing routing.
    async fn check_maintenance(&self, alert: &Alert, now: DateTime<Utc>) -> Option<MaintenanceCheck> {
        let evaluator = self.maintenance.as_ref()?;
        match evaluator.check_alert(alert, now).await {
            Ok(check) => Some(check),
            Err(e) => {
                warn!(alert = %alert.id, error = %e, "maintenance check failed");
                None
            }
        }
    }

    /// Resolver enrichment; every failure is soft.
    async fn enrich(&self, alert: Alert, now: DateTime<Utc>) -> RouteContext {
        let mut ctx = RouteContext::new(alert, now);

        if let Some(ref resolver) = self.customers {
            match resolver.resolve_with_tier(&ctx.alert).await {
                Ok((resolved, tier)) => {
                    debug!(
                        alert = %ctx.alert.id,
                        customer = %resolved.customer.id,
                        method = ?resolved.method,
                        "customer resolved"
                    );
                    ctx = ctx.with_customer(resolved.customer, tier);
                }
                Err(e) => debug!(alert = %ctx.alert.id, error = %e, "customer not resolved"),
            }
        }

        if let Some(ref resolver) = self.equipment {
            match resolver.resolve(&ctx.alert).await {
                Ok(resolved) => {
                    debug!(
                        alert = %ctx.alert.id,
                        equipment = %resolved.equipment.name,
                        method = ?resolved.method,
                        "equipment resolved"
                    );
                    ctx = ctx.with_equipment(resolved.equipment);
                }
                Err(e) => debug!(alert = %ctx.alert.id, error = %e, "equipment not resolved"),
            }
        }

        ctx
    }

    /// Best-effort audit persistence: failures are logged, never
    /// surfaced.
    async fn persist_audit(&self, log: AuditLog) {
        if let Err(e) = self.audit.append(log).await {
            error!(error = %e, "failed to persist routing audit log");
        }
    }
}

fn maintenance_flags(check: Option<&MaintenanceCheck>) -> (bool, Vec<String>) {
    match check {
        Some(check) => (
            check.in_maintenance,
            check
                .matching_windows
                .iter()
                .map(|w| w.id.clone())
                .collect(),
        ),
        None => (false, Vec::new()),
    }
}

/// Every CEL expression a rule carries.
fn rule_expressions(rule: &RoutingRule) -> impl Iterator<Item = &str> {
    rule.cel_expression
        .as_deref()
        .into_iter()
        .chain(rule.conditions.iter().filter_map(|c| match c {
            siren_core::Condition::Cel { expr } => Some(expr.as_str()),
            _ => None,
        }))
}
