//! Route table for the query API.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Movie catalog
        .route("/api/movies/search", get(handlers::search_movies))
        .route("/api/movies/:movie_id/similar", get(handlers::similar_movies))
        // Users
        .route("/api/users/:user_id/neighbors", get(handlers::similar_users))
        .route(
            "/api/users/:user_id/recommendations",
            get(handlers::recommendations),
        )
        // Point prediction
        .route("/api/predict", get(handlers::predict))
        // Temporal analytics
        .route("/api/temporal/trends", get(handlers::temporal_trends))
        .route("/api/temporal/seasonal", get(handlers::temporal_seasonal))
        .route("/api/temporal/popular", get(handlers::temporal_popular))
        .route(
            "/api/temporal/user-weights/:user_id",
            get(handlers::temporal_user_weights),
        )
        .route("/api/temporal/report", get(handlers::temporal_report))
        // The web client runs on a separate origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
