use crate::handlers;
use crate::state::AppState;
use axum::{Router, routing::get};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/cities", get(handlers::get_cities))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/performance", get(handlers::get_performance))
        .with_state(state)
}
