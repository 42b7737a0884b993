//! Error types for the Tether engine.

use thiserror::Error;

/// Errors that abort engine startup.
///
/// These are the only unrecoverable conditions: a local store that cannot
/// be read leaves the engine unloaded, because the local snapshot is the
/// source of truth for pending work. Everything else (remote failures,
/// persistence write failures) degrades and is logged instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("local store unreadable: {0}")]
    LocalLoad(#[source] StoreError),

    #[error("invalid local snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Opaque failure from a collaborator call.
///
/// Remote and local store operations succeed or fail atomically; the engine
/// treats every non-success uniformly (no status-code taxonomy, no retry
/// policy at this layer), so one stringly-typed error carries enough.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidSnapshot(err.to_string())
    }
}
