pub mod carriers;
pub mod customers;
pub mod equipment;
pub mod escalations;
pub mod health;
pub mod maintenance;
pub mod routing;
pub mod rules;
pub mod schedules;
pub mod schemas;
pub mod sites;
pub mod teams;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the Axum router with every API route and middleware layer.
///
/// Alert ingestion (`/routing/route`, `/routing/simulate`) runs under
/// the webhook payload limit; everything else under the admin limit.
pub fn router(state: AppState, webhook_limit: usize, admin_limit: usize) -> Router {
    let ingest = Router::new()
        .route("/api/v1/routing/route", post(routing::route_alert))
        .route("/api/v1/routing/simulate", post(routing::simulate))
        .layer(RequestBodyLimitLayer::new(webhook_limit));

    let admin = Router::new()
        // Routing rules
        .route(
            "/api/v1/routing/rules",
            post(rules::create).get(rules::list),
        )
        .route("/api/v1/routing/rules/reorder", put(rules::reorder))
        .route(
            "/api/v1/routing/rules/{id}",
            get(rules::get_one).put(rules::update).delete(rules::delete),
        )
        .route("/api/v1/routing/test", post(routing::test_rule))
        .route("/api/v1/routing/audit-logs", get(routing::audit_logs))
        // Customer tiers
        .route(
            "/api/v1/tiers",
            post(customers::create_tier).get(customers::list_tiers),
        )
        .route(
            "/api/v1/tiers/{id}",
            get(customers::get_tier)
                .put(customers::update_tier)
                .delete(customers::delete_tier),
        )
        // Customers
        .route(
            "/api/v1/customers",
            post(customers::create).get(customers::list),
        )
        .route(
            "/api/v1/customers/{id}",
            get(customers::get_one)
                .put(customers::update)
                .delete(customers::delete),
        )
        // Equipment types
        .route(
            "/api/v1/equipment-types",
            post(equipment::create).get(equipment::list),
        )
        .route(
            "/api/v1/equipment-types/{id}",
            get(equipment::get_one)
                .put(equipment::update)
                .delete(equipment::delete),
        )
        // Sites
        .route("/api/v1/sites", post(sites::create).get(sites::list))
        .route(
            "/api/v1/sites/{id}",
            get(sites::get_one).put(sites::update).delete(sites::delete),
        )
        // Teams
        .route("/api/v1/teams", post(teams::create).get(teams::list))
        .route(
            "/api/v1/teams/{id}",
            get(teams::get_one).put(teams::update).delete(teams::delete),
        )
        // Carriers
        .route(
            "/api/v1/carriers",
            post(carriers::create).get(carriers::list),
        )
        .route(
            "/api/v1/carriers/{id}",
            get(carriers::get_one)
                .put(carriers::update)
                .delete(carriers::delete),
        )
        // Schedules and on-call
        .route(
            "/api/v1/schedules",
            post(schedules::create).get(schedules::list),
        )
        .route(
            "/api/v1/schedules/{id}",
            get(schedules::get_one)
                .put(schedules::update)
                .delete(schedules::delete),
        )
        .route("/api/v1/schedules/{id}/oncall", get(schedules::current_oncall))
        .route("/api/v1/schedules/{id}/shifts", get(schedules::upcoming))
        .route(
            "/api/v1/schedules/{id}/handoff",
            get(schedules::handoff).post(schedules::acknowledge),
        )
        // Maintenance windows
        .route(
            "/api/v1/maintenance-windows",
            post(maintenance::create).get(maintenance::list),
        )
        .route(
            "/api/v1/maintenance-windows/active",
            get(maintenance::active),
        )
        .route("/api/v1/maintenance-windows/check", post(maintenance::check))
        .route(
            "/api/v1/maintenance-windows/{id}",
            get(maintenance::get_one)
                .put(maintenance::update)
                .delete(maintenance::delete),
        )
        .route(
            "/api/v1/maintenance-windows/{id}/cancel",
            post(maintenance::cancel),
        )
        // Escalation policies and the stub runtime
        .route(
            "/api/v1/escalation-policies",
            post(escalations::create_policy).get(escalations::list_policies),
        )
        .route(
            "/api/v1/escalation-policies/{id}",
            get(escalations::get_policy)
                .put(escalations::update_policy)
                .delete(escalations::delete_policy),
        )
        .route("/api/v1/escalations", post(escalations::start))
        .route(
            "/api/v1/escalations/{id}",
            get(escalations::get_active).delete(escalations::cancel),
        )
        .layer(RequestBodyLimitLayer::new(admin_limit));

    Router::new()
        .route("/healthz", get(health::healthz))
        .merge(ingest)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
