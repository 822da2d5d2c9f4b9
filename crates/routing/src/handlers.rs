//! Action handlers and the collaborator interfaces they delegate to.
//!
//! The executor never hard-codes notification logic: each action tag is
//! dispatched through the [`HandlerRegistry`], and the built-in
//! handlers delegate to small, mockable collaborator traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use siren_core::{Action, Alert, NotifyScope, OncallLevel};
use siren_schedule::oncall_at;
use siren_store::ScheduleStore;

use crate::context::RouteContext;

/// Error returned by an action handler.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    /// Whether the executor may retry the attempt.
    pub retryable: bool,
}

impl HandlerError {
    /// A transient failure the executor may retry.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A permanent failure; retrying would not help.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// What a successful handler produced.
#[derive(Debug, Clone, Default)]
pub struct HandlerOutcome {
    /// Ids of notifications sent (ticket ids for `create_ticket`).
    pub notification_ids: Vec<String>,
    /// Set by the escalate handler.
    pub escalation_id: Option<String>,
}

/// One registered action handler.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError>;
}

/// Registry mapping action tags to handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an action tag, replacing any previous one.
    pub fn register(&mut self, tag: &'static str, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(tag, handler);
    }

    /// Look up the handler for an action.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(tag).cloned()
    }

    /// A registry where every known tag maps to a stub that records
    /// success without side effects. Simulation runs on this.
    #[must_use]
    pub fn recording() -> Self {
        let stub: Arc<dyn ActionHandler> = Arc::new(StubHandler);
        let mut registry = Self::new();
        for tag in [
            "notify_team",
            "notify_channel",
            "notify_user",
            "notify_oncall",
            "suppress",
            "aggregate",
            "escalate",
            "create_ticket",
            "set_labels",
        ] {
            registry.register(tag, Arc::clone(&stub));
        }
        registry
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&&str> = self.handlers.keys().collect();
        tags.sort();
        f.debug_struct("HandlerRegistry").field("tags", &tags).finish()
    }
}

// ---------------------------------------------------------------------------
// Collaborator interfaces
// ---------------------------------------------------------------------------

/// Sends notifications to teams, channels, and users.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_team(
        &self,
        team_id: &str,
        scope: NotifyScope,
        alert: &Alert,
        template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError>;

    async fn notify_channel(
        &self,
        target: &str,
        alert: &Alert,
        template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError>;

    async fn notify_user(
        &self,
        user_id: &str,
        channel_override: Option<&str>,
        alert: &Alert,
        template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError>;
}

/// Applies alert-mutating actions (aggregation, label rewrites).
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn aggregate(
        &self,
        alert: &Alert,
        group_by: &[String],
        window_seconds: u64,
        max_alerts: u32,
    ) -> Result<(), HandlerError>;

    async fn set_labels(
        &self,
        alert: &Alert,
        labels: &HashMap<String, String>,
        overwrite_existing: bool,
    ) -> Result<(), HandlerError>;
}

/// Starts escalations along a policy.
#[async_trait]
pub trait EscalationLauncher: Send + Sync {
    async fn start(
        &self,
        alert: &Alert,
        policy_id: &str,
        start_at_step: u32,
        urgent: bool,
    ) -> Result<String, HandlerError>;
}

/// Creates tickets in an external tracker.
#[async_trait]
pub trait TicketCreator: Send + Sync {
    async fn create(
        &self,
        alert: &Alert,
        provider: &str,
        project_key: &str,
        ticket_type: &str,
        fields: &HashMap<String, String>,
        template_id: Option<&str>,
    ) -> Result<String, HandlerError>;
}

/// Everything the default handler set needs.
pub struct HandlerDeps {
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub sink: Arc<dyn AlertSink>,
    pub launcher: Arc<dyn EscalationLauncher>,
    pub tickets: Arc<dyn TicketCreator>,
    pub schedules: Arc<dyn ScheduleStore>,
}

/// Build the production registry with one handler per action tag.
#[must_use]
pub fn default_registry(deps: HandlerDeps) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    let notify = Arc::new(NotifyHandler {
        dispatcher: Arc::clone(&deps.dispatcher),
    });
    registry.register("notify_team", notify.clone());
    registry.register("notify_channel", notify.clone());
    registry.register("notify_user", notify);
    registry.register(
        "notify_oncall",
        Arc::new(OncallHandler {
            schedules: deps.schedules,
            dispatcher: deps.dispatcher,
        }),
    );
    registry.register("suppress", Arc::new(SuppressHandler));
    let sink = Arc::new(SinkHandler { sink: deps.sink });
    registry.register("aggregate", sink.clone());
    registry.register("set_labels", sink);
    registry.register(
        "escalate",
        Arc::new(EscalateHandler {
            launcher: deps.launcher,
        }),
    );
    registry.register(
        "create_ticket",
        Arc::new(TicketHandler {
            tickets: deps.tickets,
        }),
    );
    registry
}

// ---------------------------------------------------------------------------
// Built-in handlers
// ---------------------------------------------------------------------------

struct NotifyHandler {
    dispatcher: Arc<dyn NotificationDispatcher>,
}

#[async_trait]
impl ActionHandler for NotifyHandler {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let ids = match action {
            Action::NotifyTeam {
                team_id,
                scope,
                template_id,
            } => {
                self.dispatcher
                    .notify_team(team_id, *scope, &ctx.alert, template_id.as_deref())
                    .await?
            }
            Action::NotifyChannel {
                target,
                template_id,
            } => {
                self.dispatcher
                    .notify_channel(target, &ctx.alert, template_id.as_deref())
                    .await?
            }
            Action::NotifyUser {
                user_id,
                channel_override,
                template_id,
            } => {
                self.dispatcher
                    .notify_user(
                        user_id,
                        channel_override.as_deref(),
                        &ctx.alert,
                        template_id.as_deref(),
                    )
                    .await?
            }
            other => {
                return Err(HandlerError::permanent(format!(
                    "notify handler cannot execute {}",
                    other.tag()
                )));
            }
        };
        Ok(HandlerOutcome {
            notification_ids: ids,
            escalation_id: None,
        })
    }
}

/// Resolves the current on-call from a schedule, then notifies them.
struct OncallHandler {
    schedules: Arc<dyn ScheduleStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

#[async_trait]
impl ActionHandler for OncallHandler {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let Action::NotifyOncall {
            schedule_id,
            level,
            template_id,
        } = action
        else {
            return Err(HandlerError::permanent("oncall handler got a foreign action"));
        };

        let schedule = self
            .schedules
            .get(schedule_id)
            .await
            .map_err(|e| HandlerError::retryable(format!("schedule lookup failed: {e}")))?;
        let snapshot = oncall_at(&schedule, ctx.now)
            .map_err(|e| HandlerError::permanent(format!("oncall computation failed: {e}")))?;

        let user = match level {
            OncallLevel::Primary => snapshot.primary_user_id,
            OncallLevel::Secondary => snapshot.secondary_user_id,
        };
        let Some(user) = user else {
            return Err(HandlerError::permanent(format!(
                "schedule {schedule_id} has no {level:?} on-call at {}",
                ctx.now
            )));
        };

        let ids = self
            .dispatcher
            .notify_user(&user, None, &ctx.alert, template_id.as_deref())
            .await?;
        Ok(HandlerOutcome {
            notification_ids: ids,
            escalation_id: None,
        })
    }
}

/// Suppression has no side effect beyond the response flags the router
/// derives; this handler only logs when asked to.
struct SuppressHandler;

#[async_trait]
impl ActionHandler for SuppressHandler {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        if let Action::Suppress {
            reason,
            log_suppression: true,
            ..
        } = action
        {
            info!(alert = %ctx.alert.id, reason, "alert suppressed by routing rule");
        }
        Ok(HandlerOutcome::default())
    }
}

struct SinkHandler {
    sink: Arc<dyn AlertSink>,
}

#[async_trait]
impl ActionHandler for SinkHandler {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        match action {
            Action::Aggregate {
                group_by,
                window_seconds,
                max_alerts,
            } => {
                self.sink
                    .aggregate(&ctx.alert, group_by, *window_seconds, *max_alerts)
                    .await?;
            }
            Action::SetLabels {
                labels,
                overwrite_existing,
            } => {
                self.sink
                    .set_labels(&ctx.alert, labels, *overwrite_existing)
                    .await?;
            }
            other => {
                return Err(HandlerError::permanent(format!(
                    "sink handler cannot execute {}",
                    other.tag()
                )));
            }
        }
        Ok(HandlerOutcome::default())
    }
}

struct EscalateHandler {
    launcher: Arc<dyn EscalationLauncher>,
}

#[async_trait]
impl ActionHandler for EscalateHandler {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let Action::Escalate {
            policy_id,
            start_at_step,
            urgent,
        } = action
        else {
            return Err(HandlerError::permanent("escalate handler got a foreign action"));
        };
        let escalation_id = self
            .launcher
            .start(&ctx.alert, policy_id, *start_at_step, *urgent)
            .await?;
        Ok(HandlerOutcome {
            notification_ids: Vec::new(),
            escalation_id: Some(escalation_id),
        })
    }
}

struct TicketHandler {
    tickets: Arc<dyn TicketCreator>,
}

#[async_trait]
impl ActionHandler for TicketHandler {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let Action::CreateTicket {
            provider,
            project_key,
            ticket_type,
            fields,
            template_id,
        } = action
        else {
            return Err(HandlerError::permanent("ticket handler got a foreign action"));
        };
        let ticket_id = self
            .tickets
            .create(
                &ctx.alert,
                provider,
                project_key,
                ticket_type,
                fields,
                template_id.as_deref(),
            )
            .await?;
        Ok(HandlerOutcome {
            notification_ids: vec![ticket_id],
            escalation_id: None,
        })
    }
}

/// Stub that succeeds without side effects; simulation runs on it.
struct StubHandler;

#[async_trait]
impl ActionHandler for StubHandler {
    async fn execute(
        &self,
        action: &Action,
        ctx: &RouteContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        debug!(alert = %ctx.alert.id, action = action.tag(), "simulated action");
        Ok(HandlerOutcome::default())
    }
}

// ---------------------------------------------------------------------------
// Reference collaborators
// ---------------------------------------------------------------------------

/// Dispatcher that logs every notification and returns generated ids.
/// The single-node deployment wires this in where no real notification
/// backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify_team(
        &self,
        team_id: &str,
        scope: NotifyScope,
        alert: &Alert,
        _template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError> {
        info!(team = team_id, ?scope, alert = %alert.id, summary = %alert.summary, "notify team");
        Ok(vec![Uuid::new_v4().to_string()])
    }

    async fn notify_channel(
        &self,
        target: &str,
        alert: &Alert,
        _template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError> {
        info!(channel = target, alert = %alert.id, summary = %alert.summary, "notify channel");
        Ok(vec![Uuid::new_v4().to_string()])
    }

    async fn notify_user(
        &self,
        user_id: &str,
        channel_override: Option<&str>,
        alert: &Alert,
        _template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError> {
        info!(user = user_id, channel = ?channel_override, alert = %alert.id, "notify user");
        Ok(vec![Uuid::new_v4().to_string()])
    }
}

#[async_trait]
impl AlertSink for LogNotifier {
    async fn aggregate(
        &self,
        alert: &Alert,
        group_by: &[String],
        window_seconds: u64,
        max_alerts: u32,
    ) -> Result<(), HandlerError> {
        info!(alert = %alert.id, ?group_by, window_seconds, max_alerts, "aggregate alert");
        Ok(())
    }

    async fn set_labels(
        &self,
        alert: &Alert,
        labels: &HashMap<String, String>,
        overwrite_existing: bool,
    ) -> Result<(), HandlerError> {
        info!(alert = %alert.id, ?labels, overwrite_existing, "set alert labels");
        Ok(())
    }
}

#[async_trait]
impl EscalationLauncher for LogNotifier {
    async fn start(
        &self,
        alert: &Alert,
        policy_id: &str,
        start_at_step: u32,
        urgent: bool,
    ) -> Result<String, HandlerError> {
        warn!(alert = %alert.id, policy = policy_id, start_at_step, urgent, "escalation started");
        Ok(policy_id.to_owned())
    }
}

#[async_trait]
impl TicketCreator for LogNotifier {
    async fn create(
        &self,
        alert: &Alert,
        provider: &str,
        project_key: &str,
        ticket_type: &str,
        _fields: &HashMap<String, String>,
        _template_id: Option<&str>,
    ) -> Result<String, HandlerError> {
        let ticket_id = format!("{project_key}-{}", &Uuid::new_v4().to_string()[..8]);
        info!(alert = %alert.id, provider, ticket_type, ticket = %ticket_id, "ticket created");
        Ok(ticket_id)
    }
}

/// Dispatcher that records every notification for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    /// `(target, alert_id)` pairs keyed by notification id.
    pub sent: DashMap<String, (String, String)>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, target: &str, alert: &Alert) -> Vec<String> {
        let id = Uuid::new_v4().to_string();
        self.sent
            .insert(id.clone(), (target.to_owned(), alert.id.clone()));
        vec![id]
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn notify_team(
        &self,
        team_id: &str,
        _scope: NotifyScope,
        alert: &Alert,
        _template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError> {
        Ok(self.record(&format!("team:{team_id}"), alert))
    }

    async fn notify_channel(
        &self,
        target: &str,
        alert: &Alert,
        _template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError> {
        Ok(self.record(&format!("channel:{target}"), alert))
    }

    async fn notify_user(
        &self,
        user_id: &str,
        _channel_override: Option<&str>,
        alert: &Alert,
        _template_id: Option<&str>,
    ) -> Result<Vec<String>, HandlerError> {
        Ok(self.record(&format!("user:{user_id}"), alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use siren_core::{AlertSource, Severity};

    fn ctx() -> RouteContext {
        RouteContext::new(
            Alert::new("fp", "x", AlertSource::Prometheus, Severity::High),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn recording_dispatcher_captures_targets() {
        let notifier = RecordingNotifier::new();
        let ctx = ctx();
        let ids = notifier
            .notify_team("ops", NotifyScope::All, &ctx.alert, None)
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        let (target, alert_id) = notifier.sent.get(&ids[0]).unwrap().value().clone();
        assert_eq!(target, "team:ops");
        assert_eq!(alert_id, ctx.alert.id);
    }

    #[tokio::test]
    async fn recording_registry_covers_every_tag() {
        let registry = HandlerRegistry::recording();
        for tag in [
            "notify_team",
            "notify_channel",
            "notify_user",
            "notify_oncall",
            "suppress",
            "aggregate",
            "escalate",
            "create_ticket",
            "set_labels",
        ] {
            assert!(registry.get(tag).is_some(), "missing stub for {tag}");
        }
    }

    #[tokio::test]
    async fn suppress_handler_succeeds_without_effects() {
        let handler = SuppressHandler;
        let outcome = handler
            .execute(
                &Action::Suppress {
                    reason: "known issue".into(),
                    duration_seconds: None,
                    log_suppression: true,
                },
                &ctx(),
            )
            .await
            .unwrap();
        assert!(outcome.notification_ids.is_empty());
        assert!(outcome.escalation_id.is_none());
    }

    #[tokio::test]
    async fn log_notifier_produces_ids() {
        let notifier = LogNotifier;
        let ids = notifier
            .notify_channel("#alerts", &ctx().alert, None)
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
    }
}
