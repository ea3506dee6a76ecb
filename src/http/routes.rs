use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview lifecycle
        .route("/interviews", post(handlers::start_interview))
        .route(
            "/interviews/:interview_id",
            delete(handlers::close_interview),
        )
        // Turn control
        .route("/interviews/:interview_id/stop", post(handlers::stop_turn))
        .route(
            "/interviews/:interview_id/retry-microphone",
            post(handlers::retry_microphone),
        )
        .route(
            "/interviews/:interview_id/answer",
            post(handlers::submit_answer),
        )
        // Interview queries
        .route(
            "/interviews/:interview_id/status",
            get(handlers::get_interview_status),
        )
        .route(
            "/interviews/:interview_id/report",
            get(handlers::get_interview_report),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // Browser front ends call the API from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
