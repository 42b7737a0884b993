//! Tether server: the authoritative todo store that clients reconcile
//! against.
//!
//! Exposes a small JSON API over SQLite:
//!
//! - `GET /todo` lists every stored todo
//! - `POST /todo` creates a todo, idempotent by id
//! - `DELETE /todo/{id}` removes a todo, idempotent
//!
//! All mutations are safe to replay because offline clients retry
//! unconfirmed work on their next bootstrap.

pub mod config;
pub mod db;
pub mod error;
pub mod routes;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pool: db::Pool,
}

/// Build the application router with middleware attached.
pub fn app(pool: db::Pool) -> Router {
    let state = AppState { pool };

    routes::create_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
