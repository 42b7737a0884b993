//! Todo CRUD endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use tether_engine::RemoteItem;

use crate::{db, error::Result, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/todo", get(list_todos).post(create_todo))
        .route("/todo/{id}", delete(delete_todo))
}

#[derive(Debug, Deserialize)]
struct CreateTodo {
    id: String,
    value: String,
}

/// List all todos in insertion order.
async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<RemoteItem>>> {
    let todos = db::list_todos(&state.pool).await?;
    Ok(Json(todos))
}

/// Create a todo. Replaying a create with an id that already exists
/// overwrites the stored value, so retries after a lost confirmation
/// converge instead of erroring.
async fn create_todo(
    State(state): State<AppState>,
    Json(payload): Json<CreateTodo>,
) -> Result<(StatusCode, Json<RemoteItem>)> {
    let item = RemoteItem::new(payload.id, payload.value);
    db::upsert_todo(&state.pool, &item).await?;
    tracing::info!(id = %item.id, "created todo");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Delete a todo. Deleting an unknown id succeeds, so replayed deletes
/// are harmless.
async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<&'static str>> {
    let existed = db::delete_todo(&state.pool, &id).await?;
    if existed {
        tracing::info!(id = %id, "deleted todo");
    } else {
        tracing::debug!(id = %id, "delete of unknown todo");
    }
    Ok(Json("Deleted"))
}
