use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};

use siren_core::{Action, ActionExecution};

use crate::context::RouteContext;
use crate::handlers::{HandlerError, HandlerRegistry};

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Retry attempts after the first failure of a retryable action.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Whether a failed action lets subsequent actions run.
    pub continue_on_error: bool,
    /// Overall per-alert budget; every action inherits the remainder.
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(250),
            continue_on_error: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// What executing a matched action list produced.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// One record per executed action, in execution order. Actions
    /// skipped by a timeout or a `continue_on_error=false` stop are
    /// absent.
    pub executions: Vec<ActionExecution>,
    /// Union of notification ids across successful executions.
    pub notification_ids: Vec<String>,
    /// Set when a `suppress` action was present.
    pub suppressed: bool,
    /// The first suppress action's reason.
    pub suppression_reason: Option<String>,
    pub escalation_started: bool,
    pub escalation_id: Option<String>,
    /// Whether the overall deadline cut execution short.
    pub deadline_exceeded: bool,
}

/// Dispatches matched actions through registered handlers with retry,
/// an overall deadline, and continue-on-error semantics.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    registry: HandlerRegistry,
    config: ExecutorConfig,
}

impl ActionExecutor {
    #[must_use]
    pub fn new(registry: HandlerRegistry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Run `actions` in order against the context.
    pub async fn execute(&self, actions: &[Action], ctx: &RouteContext) -> ExecutionReport {
        let deadline = Instant::now() + self.config.timeout;
        let mut report = ExecutionReport::default();

        for action in actions {
            if Instant::now() >= deadline {
                warn!(
                    alert = %ctx.alert.id,
                    skipped = actions.len() - report.executions.len(),
                    "routing deadline exceeded, skipping remaining actions"
                );
                report.deadline_exceeded = true;
                break;
            }

            // Suppression flags come from the action itself so they are
            // set even if the handler's logging side fails.
            if let Action::Suppress { reason, .. } = action {
                report.suppressed = true;
                if report.suppression_reason.is_none() {
                    report.suppression_reason = Some(reason.clone());
                }
            }

            let execution = self.run_action(action, ctx, deadline).await;
            let stop = !execution.success && !self.config.continue_on_error;

            if execution.success {
                report
                    .notification_ids
                    .extend(execution.notification_ids.iter().cloned());
                if let Action::Escalate { policy_id, .. } = action {
                    report.escalation_started = true;
                    report.escalation_id = Some(policy_id.clone());
                }
            }
            report.executions.push(execution);

            if stop {
                debug!(alert = %ctx.alert.id, "stopping action pipeline on failure");
                break;
            }
        }

        report
    }

    /// Run one action with retries inside the shared deadline.
    async fn run_action(
        &self,
        action: &Action,
        ctx: &RouteContext,
        deadline: Instant,
    ) -> ActionExecution {
        let started_at = Utc::now();
        let clock = Instant::now();

        let Some(handler) = self.registry.get(action.tag()) else {
            return ActionExecution {
                action_type: action.tag().to_owned(),
                started_at,
                duration_ms: 0,
                success: false,
                error_message: Some(format!("no handler registered for {}", action.tag())),
                retryable: false,
                notification_ids: Vec::new(),
            };
        };

        let mut last_error: Option<HandlerError> = None;
        let mut attempt = 0;
        let outcome = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                last_error = Some(HandlerError::retryable("routing deadline exceeded"));
                break None;
            }

            match tokio::time::timeout(remaining, handler.execute(action, ctx)).await {
                Ok(Ok(outcome)) => break Some(outcome),
                Ok(Err(e)) => {
                    let may_retry = e.retryable && attempt < self.config.max_retries;
                    debug!(
                        action = action.tag(),
                        attempt,
                        error = %e,
                        retrying = may_retry,
                        "action attempt failed"
                    );
                    last_error = Some(e);
                    if !may_retry {
                        break None;
                    }
                    attempt += 1;
                    tokio::time::sleep(self.config.retry_delay.min(remaining)).await;
                }
                Err(_) => {
                    last_error =
                        Some(HandlerError::retryable("action timed out at routing deadline"));
                    break None;
                }
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = clock.elapsed().as_millis() as u64;
        match outcome {
            Some(outcome) => ActionExecution {
                action_type: action.tag().to_owned(),
                started_at,
                duration_ms,
                success: true,
                error_message: None,
                retryable: false,
                notification_ids: outcome.notification_ids,
            },
            None => {
                let (message, retryable) = last_error
                    .map(|e| (e.message, e.retryable))
                    .unwrap_or_else(|| ("action failed".to_owned(), false));
                ActionExecution {
                    action_type: action.tag().to_owned(),
                    started_at,
                    duration_ms,
                    success: false,
                    error_message: Some(message),
                    retryable,
                    notification_ids: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use siren_core::{Alert, AlertSource, Severity};

    use super::*;
    use crate::handlers::{ActionHandler, HandlerOutcome};

    fn ctx() -> RouteContext {
        RouteContext::new(
            Alert::new("fp", "x", AlertSource::Prometheus, Severity::High),
            Utc::now(),
        )
    }

    fn suppress() -> Action {
        Action::Suppress {
            reason: "known issue".into(),
            duration_seconds: None,
            log_suppression: false,
        }
    }

    fn notify() -> Action {
        Action::NotifyChannel {
            target: "#alerts".into(),
            template_id: None,
        }
    }

    /// Fails `failures` times, then succeeds.
    struct FlakyHandler {
        failures: u32,
        retryable: bool,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ActionHandler for FlakyHandler {
        async fn execute(
            &self,
            _action: &Action,
            _ctx: &RouteContext,
        ) -> Result<HandlerOutcome, HandlerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                if self.retryable {
                    Err(HandlerError::retryable("transient"))
                } else {
                    Err(HandlerError::permanent("broken"))
                }
            } else {
                Ok(HandlerOutcome {
                    notification_ids: vec!["n-1".into()],
                    escalation_id: None,
                })
            }
        }
    }

    fn registry_with(handler: Arc<dyn ActionHandler>, tag: &'static str) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(tag, handler);
        registry
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            retry_delay: Duration::from_millis(1),
            ..ExecutorConfig::default()
        }
    }

    #[tokio::test]
    async fn retryable_failures_are_retried_to_success() {
        let handler = Arc::new(FlakyHandler {
            failures: 2,
            retryable: true,
            calls: AtomicU32::new(0),
        });
        let executor = ActionExecutor::new(
            registry_with(handler.clone(), "notify_channel"),
            fast_config(),
        );
        let report = executor.execute(&[notify()], &ctx()).await;
        assert_eq!(report.executions.len(), 1);
        assert!(report.executions[0].success);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.notification_ids, vec!["n-1"]);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let handler = Arc::new(FlakyHandler {
            failures: 5,
            retryable: false,
            calls: AtomicU32::new(0),
        });
        let executor = ActionExecutor::new(
            registry_with(handler.clone(), "notify_channel"),
            fast_config(),
        );
        let report = executor.execute(&[notify()], &ctx()).await;
        assert!(!report.executions[0].success);
        assert!(!report.executions[0].retryable);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let handler = Arc::new(FlakyHandler {
            failures: 100,
            retryable: true,
            calls: AtomicU32::new(0),
        });
        let executor = ActionExecutor::new(
            registry_with(handler.clone(), "notify_channel"),
            fast_config(),
        );
        let report = executor.execute(&[notify()], &ctx()).await;
        assert!(!report.executions[0].success);
        assert!(report.executions[0].retryable);
        // 1 initial attempt + max_retries.
        assert_eq!(handler.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn continue_on_error_runs_later_actions() {
        let failing = Arc::new(FlakyHandler {
            failures: 100,
            retryable: false,
            calls: AtomicU32::new(0),
        });
        let mut registry = registry_with(failing, "notify_channel");
        let ok: Arc<dyn ActionHandler> = Arc::new(FlakyHandler {
            failures: 0,
            retryable: false,
            calls: AtomicU32::new(0),
        });
        registry.register("suppress", ok);
        let executor = ActionExecutor::new(registry, fast_config());

        let report = executor.execute(&[notify(), suppress()], &ctx()).await;
        assert_eq!(report.executions.len(), 2);
        assert!(!report.executions[0].success);
        assert!(report.executions[1].success);
    }

    #[tokio::test]
    async fn stop_on_error_skips_later_actions() {
        let failing = Arc::new(FlakyHandler {
            failures: 100,
            retryable: false,
            calls: AtomicU32::new(0),
        });
        let registry = registry_with(failing, "notify_channel");
        let executor = ActionExecutor::new(
            registry,
            ExecutorConfig {
                continue_on_error: false,
                retry_delay: Duration::from_millis(1),
                ..ExecutorConfig::default()
            },
        );
        let report = executor.execute(&[notify(), suppress()], &ctx()).await;
        assert_eq!(report.executions.len(), 1);
    }

    #[tokio::test]
    async fn suppress_sets_response_flags() {
        let executor = ActionExecutor::new(HandlerRegistry::recording(), fast_config());
        let report = executor.execute(&[suppress()], &ctx()).await;
        assert!(report.suppressed);
        assert_eq!(report.suppression_reason.as_deref(), Some("known issue"));
        assert!(report.executions[0].success);
    }

    #[tokio::test]
    async fn missing_handler_records_failure() {
        let executor = ActionExecutor::new(HandlerRegistry::new(), fast_config());
        let report = executor.execute(&[notify()], &ctx()).await;
        assert!(!report.executions[0].success);
        assert!(
            report.executions[0]
                .error_message
                .as_deref()
                .is_some_and(|m| m.contains("no handler registered"))
        );
    }

    #[tokio::test]
    async fn deadline_cuts_execution_short() {
        struct SlowHandler;

        #[async_trait]
        impl ActionHandler for SlowHandler {
            async fn execute(
                &self,
                _action: &Action,
                _ctx: &RouteContext,
            ) -> Result<HandlerOutcome, HandlerError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(HandlerOutcome::default())
            }
        }

        let registry = registry_with(Arc::new(SlowHandler), "notify_channel");
        let executor = ActionExecutor::new(
            registry,
            ExecutorConfig {
                timeout: Duration::from_millis(50),
                retry_delay: Duration::from_millis(1),
                ..ExecutorConfig::default()
            },
        );
        let report = executor
            .execute(&[notify(), notify(), suppress()], &ctx())
            .await;
        // The first action times out; the rest are skipped.
        assert!(report.deadline_exceeded);
        assert_eq!(report.executions.len(), 1);
        assert!(!report.executions[0].success);
    }
}
