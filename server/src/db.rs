//! SQLite storage for the todo table.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tether_engine::RemoteItem;

/// Shared connection pool.
pub type Pool = SqlitePool;

/// Create a database pool.
///
/// SQLite allows a single writer, so one pooled connection is enough; it
/// also keeps `sqlite::memory:` databases consistent in tests.
pub async fn create_pool(database_url: &str) -> Result<Pool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
}

/// Create the todo table if it does not exist yet.
pub async fn init_schema(pool: &Pool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE TABLE IF NOT EXISTS todo (id TEXT PRIMARY KEY, value TEXT NOT NULL)")
        .execute(pool)
        .await?;
    Ok(())
}

/// List all todos in insertion order.
pub async fn list_todos(pool: &Pool) -> Result<Vec<RemoteItem>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, value FROM todo ORDER BY rowid")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| RemoteItem::new(row.get::<String, _>("id"), row.get::<String, _>("value")))
        .collect())
}

/// Insert a todo, replacing the value if the id already exists.
///
/// Creates are idempotent by id so that a client retrying an unconfirmed
/// create can never wedge itself on a duplicate.
pub async fn upsert_todo(pool: &Pool, item: &RemoteItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO todo (id, value) VALUES (?1, ?2) \
         ON CONFLICT(id) DO UPDATE SET value = excluded.value",
    )
    .bind(&item.id)
    .bind(&item.value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a todo by id. Returns whether a row existed.
pub async fn delete_todo(pool: &Pool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todo WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
