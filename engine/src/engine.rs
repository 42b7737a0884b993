//! The async driver: bootstrap once, then a single-consumer event loop.
//!
//! All state lives in one task. User commands and remote-call completions
//! arrive on the same mpsc stream, so the collection is only ever touched
//! from one place and a completion that races a removal is simply detected
//! as stale and discarded. Consumers observe the engine through a `watch`
//! channel carrying [`EngineSnapshot`] values.
//!
//! Mutations are optimistic: the collection (and the published snapshot)
//! changes before the remote round-trip resolves. Failures never surface to
//! the caller; they downgrade the item to its settled pending state and are
//! logged, leaving the next bootstrap to retry.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bootstrap::BootstrapPlan;
use crate::collection::Collection;
use crate::error::{Error, Result, StoreError};
use crate::item::{Item, RemoteItem, SyncState};
use crate::traits::{LocalStore, RemoteStore};
use crate::{ItemId, STORAGE_KEY};

/// Capacity of the command/completion stream.
const EVENT_BUFFER: usize = 64;

/// A point-in-time view of the engine for consumers.
///
/// Tombstoned and mid-delete items are already filtered out; they are an
/// internal bookkeeping detail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    /// Visible items in display order.
    pub items: Vec<Item>,
    /// True iff no item holds unsaved work.
    pub fully_synced: bool,
}

impl EngineSnapshot {
    fn of(collection: &Collection) -> Self {
        Self {
            items: collection.visible().cloned().collect(),
            fully_synced: collection.fully_synced(),
        }
    }
}

/// Everything that can reach the reconciliation loop.
#[derive(Debug)]
enum Event {
    Add { id: ItemId, value: String },
    Remove { id: ItemId },
    CreateResolved { id: ItemId, outcome: std::result::Result<(), StoreError> },
    DeleteResolved { id: ItemId, outcome: std::result::Result<(), StoreError> },
    Shutdown,
}

/// The reconciliation engine, parameterized over its two collaborators.
pub struct SyncEngine<R, L> {
    remote: Arc<R>,
    local: Arc<L>,
}

impl<R: RemoteStore, L: LocalStore> SyncEngine<R, L> {
    pub fn new(remote: R, local: L) -> Self {
        Self {
            remote: Arc::new(remote),
            local: Arc::new(local),
        }
    }

    /// Run bootstrap and, on success, spawn the reconciliation loop.
    ///
    /// The only fatal outcome is an unusable local store ([`Error::LocalLoad`]
    /// or [`Error::InvalidSnapshot`]): without the local snapshot the merge
    /// cannot proceed safely, so no handle is produced and no mutation is
    /// possible. A failed remote listing falls back to the local snapshot
    /// and the engine starts offline.
    pub async fn start(self) -> Result<SyncHandle> {
        let local_snapshot = match self.local.get(STORAGE_KEY).await {
            Ok(Some(json)) => Collection::from_snapshot_json(&json)?,
            Ok(None) => Collection::new(),
            Err(err) => return Err(Error::LocalLoad(err)),
        };

        let collection = match self.remote.list().await {
            Ok(remote_items) => self.confirm_pending(remote_items, local_snapshot).await,
            Err(err) => {
                warn!(%err, "remote list failed, starting from local snapshot");
                local_snapshot
            }
        };

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::of(&collection));

        let looper = Looper {
            collection,
            remote: self.remote,
            local: self.local,
            events: events_tx.clone(),
            snapshot: snapshot_tx,
            cancelled_creates: HashSet::new(),
        };
        // The bootstrap merge is itself a change worth persisting.
        looper.persist();
        tokio::spawn(looper.run(events_rx));

        Ok(SyncHandle {
            events: events_tx,
            snapshot: snapshot_rx,
        })
    }

    /// Issue the plan's confirmation calls concurrently and fold the
    /// outcomes. Each call stands alone; there is no rollback.
    async fn confirm_pending(&self, remote_items: Vec<RemoteItem>, local: Collection) -> Collection {
        let plan = BootstrapPlan::build(remote_items, local);
        if plan.is_settled() {
            return plan.resolve(Vec::new(), Vec::new());
        }

        let creates = join_all(plan.to_create().iter().map(|item| {
            let remote = Arc::clone(&self.remote);
            async move { remote.create(item).await }
        }));
        let deletes = join_all(plan.to_delete().iter().map(|id| {
            let remote = Arc::clone(&self.remote);
            async move { remote.delete(id).await }
        }));
        let (created, deleted) = tokio::join!(creates, deletes);

        plan.resolve(created, deleted)
    }
}

/// Cloneable front door to a running engine.
#[derive(Clone)]
pub struct SyncHandle {
    events: mpsc::Sender<Event>,
    snapshot: watch::Receiver<EngineSnapshot>,
}

impl SyncHandle {
    /// Add an item optimistically. Returns the generated id immediately;
    /// the remote create resolves in the background.
    pub async fn add_item(&self, value: impl Into<String>) -> ItemId {
        let id = Uuid::new_v4().to_string();
        self.send(Event::Add {
            id: id.clone(),
            value: value.into(),
        })
        .await;
        id
    }

    /// Remove an item. Unknown ids are a no-op.
    pub async fn remove_item(&self, id: &str) {
        self.send(Event::Remove { id: id.to_string() }).await;
    }

    /// Stop the reconciliation loop. In-flight remote calls are not
    /// cancelled; their completions are dropped.
    pub async fn shutdown(&self) {
        self.send(Event::Shutdown).await;
    }

    /// Watch the engine state; the receiver always holds the latest
    /// [`EngineSnapshot`].
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot.clone()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.borrow().clone()
    }

    async fn send(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            warn!("engine loop is gone, command dropped");
        }
    }
}

/// The single-consumer reconciliation loop and the state it owns.
struct Looper<R, L> {
    collection: Collection,
    remote: Arc<R>,
    local: Arc<L>,
    events: mpsc::Sender<Event>,
    snapshot: watch::Sender<EngineSnapshot>,
    /// Items removed while their create was still in flight. A successful
    /// create for one of these triggers a compensating delete; a failed one
    /// is forgotten.
    cancelled_creates: HashSet<ItemId>,
}

impl<R: RemoteStore, L: LocalStore> Looper<R, L> {
    async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            match event {
                Event::Shutdown => {
                    debug!("engine loop shutting down");
                    break;
                }
                event => {
                    if self.handle(event) {
                        self.snapshot
                            .send_replace(EngineSnapshot::of(&self.collection));
                        self.persist();
                    }
                }
            }
        }
    }

    /// Apply one event. Returns true if the collection changed.
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Add { id, value } => self.handle_add(id, value),
            Event::Remove { id } => self.handle_remove(&id),
            Event::CreateResolved { id, outcome } => self.handle_create_resolved(id, outcome),
            Event::DeleteResolved { id, outcome } => self.handle_delete_resolved(&id, outcome),
            // Consumed by `run` before dispatch.
            Event::Shutdown => false,
        }
    }

    fn handle_add(&mut self, id: ItemId, value: String) -> bool {
        let item = Item::new(id, value, SyncState::Creating);
        self.spawn_create(RemoteItem::from(&item));
        self.collection.insert(item);
        true
    }

    fn handle_remove(&mut self, id: &str) -> bool {
        let Some(item) = self.collection.get(id) else {
            debug!(%id, "remove for unknown id ignored");
            return false;
        };

        match item.state {
            // Purely local and idle: the remote store never knew about it.
            SyncState::Unsynced => {
                self.collection.remove(id);
                true
            }
            // Create still in flight: hide it now, issue nothing. The
            // completion decides whether a compensating delete is needed.
            SyncState::Creating => {
                self.collection.remove(id);
                self.cancelled_creates.insert(id.to_string());
                true
            }
            SyncState::Synced => {
                self.spawn_delete(id.to_string());
                if let Some(item) = self.collection.get_mut(id) {
                    item.state = SyncState::Deleting;
                }
                true
            }
            // Already on its way out.
            SyncState::Deleting | SyncState::Tombstoned => false,
        }
    }

    fn handle_create_resolved(
        &mut self,
        id: ItemId,
        outcome: std::result::Result<(), StoreError>,
    ) -> bool {
        if self.cancelled_creates.remove(&id) {
            // The user removed the item before its create resolved. If the
            // create landed anyway, clean the orphan up remotely; there is
            // no local state left to track either way.
            if outcome.is_ok() {
                self.spawn_delete(id);
            }
            return false;
        }

        let Some(item) = self.collection.get_mut(&id) else {
            debug!(%id, "stale create completion discarded");
            return false;
        };
        if item.state != SyncState::Creating {
            debug!(%id, state = ?item.state, "create completion for settled item discarded");
            return false;
        }

        match outcome {
            Ok(()) => item.state = SyncState::Synced,
            Err(err) => {
                warn!(%id, %err, "remote create failed, item kept unsynced");
                item.state = SyncState::Unsynced;
            }
        }
        true
    }

    fn handle_delete_resolved(
        &mut self,
        id: &str,
        outcome: std::result::Result<(), StoreError>,
    ) -> bool {
        let Some(item) = self.collection.get(id) else {
            debug!(%id, "stale delete completion discarded");
            return false;
        };
        if item.state != SyncState::Deleting {
            debug!(%id, state = ?item.state, "delete completion for settled item discarded");
            return false;
        }

        match outcome {
            Ok(()) => {
                self.collection.remove(id);
            }
            Err(err) => {
                warn!(%id, %err, "remote delete failed, tombstone kept");
                if let Some(item) = self.collection.get_mut(id) {
                    item.state = SyncState::Tombstoned;
                }
            }
        }
        true
    }

    fn spawn_create(&self, item: RemoteItem) {
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = remote.create(&item).await;
            let _ = events
                .send(Event::CreateResolved {
                    id: item.id,
                    outcome,
                })
                .await;
        });
    }

    fn spawn_delete(&self, id: ItemId) {
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = remote.delete(&id).await;
            let _ = events.send(Event::DeleteResolved { id, outcome }).await;
        });
    }

    /// Mirror the full collection to the local store, fire-and-forget.
    ///
    /// A failed write leaves the cache stale until the next successful one;
    /// that is logged, never surfaced.
    fn persist(&self) {
        let json = match self.collection.to_snapshot_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "snapshot serialization failed, skipping persistence");
                return;
            }
        };
        let local = Arc::clone(&self.local);
        tokio::spawn(async move {
            if let Err(err) = local.set(STORAGE_KEY, json).await {
                warn!(%err, "local snapshot write failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_view_filters_and_flags() {
        let mut collection = Collection::new();
        collection.insert(Item::new("a", "x", SyncState::Synced));
        collection.insert(Item::new("b", "y", SyncState::Creating));
        collection.insert(Item::new("c", "z", SyncState::Tombstoned));

        let snapshot = EngineSnapshot::of(&collection);
        let ids: Vec<_> = snapshot.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(!snapshot.fully_synced);
    }

    #[test]
    fn snapshot_view_of_empty_collection() {
        let snapshot = EngineSnapshot::of(&Collection::new());
        assert!(snapshot.items.is_empty());
        assert!(snapshot.fully_synced);
    }
}
