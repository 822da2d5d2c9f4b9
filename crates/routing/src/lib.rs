//! The routing pipeline: match an alert against ordered rules, run the
//! matched actions, and emit an audit record.
//!
//! The pipeline for each alert:
//! 1. Check maintenance windows; a matching `Suppress` window
//!    short-circuits routing entirely.
//! 2. Enrich the context through the resolvers (customer, tier,
//!    equipment).
//! 3. Evaluate every enabled rule in priority order; collect the union
//!    of matched actions in rule order.
//! 4. Execute each matched action through its registered handler with
//!    retry and an overall deadline.
//! 5. Persist the audit record best-effort and return the response.

pub mod context;
pub mod error;
pub mod eval;
pub mod executor;
pub mod handlers;
pub mod router;

pub use context::RouteContext;
pub use error::RoutingError;
pub use eval::{EvaluationOutcome, evaluate_condition, evaluate_rule, evaluate_rules};
pub use executor::{ActionExecutor, ExecutionReport, ExecutorConfig};
pub use handlers::{
    ActionHandler, AlertSink, EscalationLauncher, HandlerDeps, HandlerError, HandlerOutcome,
    HandlerRegistry, LogNotifier, NotificationDispatcher, RecordingNotifier, TicketCreator,
    default_registry,
};
pub use router::{
    AlertRouter, AlertRouterBuilder, RouteAlertResponse, SimulationResult, TestRuleResult,
};
