//! HTTP layer - axum router, shared state and request handlers
//!
//! Handlers are thin: they extract the caller and the request data, call into
//! [`crate::core`] and serialize the result. Every business rule lives in the core.

/// Caller identity extraction
pub mod auth;
/// Error to response mapping
pub mod error;
/// Request handlers grouped by resource
pub mod handlers;

use crate::{config::AppConfig, core::retry::RetryPolicy};
use axum::{
    Json, Router,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use auth::{CurrentUser, USER_ID_HEADER};

/// Shared data available to all handlers.
/// Holds the database pool and the settings handlers need per request.
#[derive(Clone)]
pub struct ApiState {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Retry policy for funding transactions
    pub funding_policy: RetryPolicy,
    /// Balance given to new accounts
    pub signup_balance: i64,
}

impl ApiState {
    /// Creates the shared state from a connection and the loaded settings.
    #[must_use]
    pub fn new(database: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            database,
            funding_policy: config.funding.retry_policy(),
            signup_balance: config.accounts.signup_balance,
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/signup", post(handlers::accounts::signup))
        .route("/me", get(handlers::accounts::me))
        .route("/me/deposit", post(handlers::accounts::deposit))
        .route(
            "/items",
            get(handlers::items::list).post(handlers::items::create),
        )
        .route(
            "/items/{id}",
            get(handlers::items::detail)
                .put(handlers::items::update)
                .delete(handlers::items::delete),
        )
        .route("/items/{id}/fund", post(handlers::funding::fund))
        .route("/items/{id}/comments", post(handlers::comments::add))
        .route(
            "/comments/{id}",
            put(handlers::comments::edit).delete(handlers::comments::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
