pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod decision;
pub mod errors;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod scoring;
pub mod services;
pub mod store;

use axum::routing::{get, post};
use axum::Router;
use handlers::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body size.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/loan-types", get(handlers::list_loan_types))
        .route("/loans", post(handlers::create_loan))
        .route("/loans/data", post(handlers::save_loan_data))
        .route("/loans/user", get(handlers::list_user_loans))
        .route("/loans/:id", get(handlers::get_loan))
        .route("/loans/:id/decision", post(handlers::process_decision))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
