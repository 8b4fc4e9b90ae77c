use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id/chat", post(handlers::chat))
        .route("/sessions/:id/recommendations", get(handlers::last_recommendations))
        .route("/sessions/:id/feedback", post(handlers::feedback))
        // Users
        .route("/users/:id/feedback", get(handlers::user_feedback))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
