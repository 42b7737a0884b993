//! Route definitions.

pub mod health;
pub mod todo;

use axum::Router;

use crate::AppState;

/// Build the full route tree.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(todo::routes())
}
