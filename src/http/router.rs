//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // Schedule intake and listing
        .route("/schedules", get(handlers::list_schedules))
        .route("/schedules", post(handlers::create_schedule))
        // Staging ledger
        .route(
            "/schedules/{schedule_id}/staging",
            post(handlers::stage_edit)
                .get(handlers::get_staged)
                .delete(handlers::discard_staged),
        )
        .route(
            "/schedules/{schedule_id}/staging/publish",
            post(handlers::publish_staged),
        )
        // Immediate status transitions
        .route(
            "/schedules/{schedule_id}/activities/{activity_id}/status",
            post(handlers::set_status),
        )
        // Audit history
        .route(
            "/schedules/{schedule_id}/history",
            get(handlers::schedule_history),
        )
        .route("/events/{event_id}", get(handlers::event_history))
        .route(
            "/activities/{activity_id}/history",
            get(handlers::activity_history),
        );

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
