//! # Tether Engine
//!
//! An offline-first reconciliation engine for a user's item list split
//! between a durable local store and an authoritative remote store.
//!
//! The engine lets the user add and remove items instantly while offline,
//! tracks each item's sync state, and reconciles local and remote state
//! whenever connectivity allows, without losing or duplicating data.
//!
//! ## Design Principles
//!
//! - **Optimistic**: user mutations apply to the in-memory collection
//!   before any network round-trip and are confirmed asynchronously
//! - **Single writer**: one loop task owns the collection; commands and
//!   remote-call completions arrive on a single event stream, so there is
//!   no shared mutable item state across tasks
//! - **Pure core**: the merge logic ([`BootstrapPlan`]) and the collection
//!   are plain data with no I/O, testable without mocks
//! - **Degrade, don't fail**: only an unusable local store is fatal; every
//!   remote failure leaves the affected item pending for a later retry
//!
//! ## Core Concepts
//!
//! ### Items and sync state
//!
//! An [`Item`] is `id + value` plus a tagged [`SyncState`]:
//! `Unsynced`, `Creating`, `Synced`, `Deleting` or `Tombstoned`. Tombstones
//! (items deleted locally but not yet confirmed remotely) stay in the
//! collection, hidden from consumers, until the remote delete lands, so
//! pending work survives restarts.
//!
//! ### Bootstrap
//!
//! On startup the engine loads the local snapshot and the remote list and
//! merges them: confirmed remote state wins on existence, local tombstones
//! trigger deletes, local unsaved items trigger creates. Confirmation calls
//! run concurrently and independently; failures keep the item pending
//! instead of dropping it.
//!
//! ### Persistence
//!
//! After every change the full collection, tombstones and unsaved items
//! included, is serialized as one JSON array of five-field records and
//! written to the local store under a fixed key. That snapshot is what
//! makes recovery across restarts possible.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether_engine::{LocalStore, RemoteStore, SyncEngine};
//!
//! # async fn example(remote: impl RemoteStore, local: impl LocalStore) -> tether_engine::Result<()> {
//! let handle = SyncEngine::new(remote, local).start().await?;
//!
//! let id = handle.add_item("buy milk").await;
//! handle.remove_item(&id).await;
//!
//! let mut state = handle.subscribe();
//! state.changed().await.ok();
//! println!("synced: {}", state.borrow().fully_synced);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod collection;
pub mod engine;
pub mod error;
pub mod item;
pub mod traits;

// Re-export main types at crate root
pub use bootstrap::{BootstrapPlan, CallOutcome};
pub use collection::Collection;
pub use engine::{EngineSnapshot, SyncEngine, SyncHandle};
pub use error::{Error, Result, StoreError};
pub use item::{Item, RemoteItem, StoredItem, SyncState};
pub use traits::{LocalStore, RemoteStore};

/// Type alias for clarity
pub type ItemId = String;

/// The fixed local-store key under which the collection snapshot lives.
pub const STORAGE_KEY: &str = "todos";
