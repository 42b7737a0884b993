//! Bootstrap reconciliation: merging the local snapshot with the remote list.
//!
//! Runs once per process lifetime, before any mutation is accepted. The
//! logic is split into a pure plan and a pure outcome fold so it can be
//! tested without any I/O:
//!
//! 1. [`BootstrapPlan::build`] partitions the local snapshot against the
//!    remote list: tombstones whose id still exists remotely need a delete,
//!    unsaved items absent remotely need a create, everything else merges
//!    immediately ("remote wins on existence").
//! 2. The caller issues the confirmation calls concurrently and
//!    independently, then folds each call's outcome back in with
//!    [`BootstrapPlan::resolve`]. There is no rollback: each outcome is
//!    evaluated on its own.
//!
//! Items whose confirmation call fails are *retained* in their pending
//! state (visible `Unsynced`, hidden `Tombstoned`) rather than dropped, so
//! no user data disappears on a flaky network; the next bootstrap retries
//! them.

use std::collections::HashMap;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::item::{Item, RemoteItem, SyncState};
use crate::ItemId;

/// Outcome of one bootstrap confirmation call.
pub type CallOutcome = std::result::Result<(), StoreError>;

/// The merged working state plus the confirmation calls it still needs.
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    /// Merged collection; `to_create` entries are in it as `Unsynced`,
    /// `to_delete` entries as `Tombstoned`.
    merged: Collection,
    /// Items present locally but unknown to the remote: need a create.
    to_create: Vec<RemoteItem>,
    /// Tombstoned ids the remote still lists: need a delete.
    to_delete: Vec<ItemId>,
}

impl BootstrapPlan {
    /// Merge a remote listing with a (settled) local snapshot.
    ///
    /// Ordering: local snapshot order first, then remote-only items in
    /// remote list order.
    pub fn build(remote: Vec<RemoteItem>, local: Collection) -> Self {
        let mut remote_values: HashMap<ItemId, String> = remote
            .iter()
            .map(|item| (item.id.clone(), item.value.clone()))
            .collect();

        let mut merged = Collection::new();
        let mut to_create = Vec::new();
        let mut to_delete = Vec::new();

        for item in local.iter() {
            match item.state {
                SyncState::Tombstoned | SyncState::Deleting => {
                    if remote_values.remove(&item.id).is_some() {
                        merged.insert(Item::new(
                            item.id.clone(),
                            item.value.clone(),
                            SyncState::Tombstoned,
                        ));
                        to_delete.push(item.id.clone());
                    }
                    // Absent remotely: the delete already happened, drop.
                }
                SyncState::Unsynced | SyncState::Creating => {
                    if let Some(value) = remote_values.remove(&item.id) {
                        // The earlier create actually landed; adopt the
                        // remote value.
                        merged.insert(Item::synced(item.id.clone(), value));
                    } else {
                        merged.insert(Item::new(
                            item.id.clone(),
                            item.value.clone(),
                            SyncState::Unsynced,
                        ));
                        to_create.push(RemoteItem::from(item));
                    }
                }
                SyncState::Synced => {
                    if let Some(value) = remote_values.remove(&item.id) {
                        merged.insert(Item::synced(item.id.clone(), value));
                    }
                    // Absent remotely: remote wins on existence, drop.
                }
            }
        }

        for item in remote {
            if let Some(value) = remote_values.remove(&item.id) {
                merged.insert(Item::synced(item.id, value));
            }
        }

        Self {
            merged,
            to_create,
            to_delete,
        }
    }

    /// Items that need a remote create.
    pub fn to_create(&self) -> &[RemoteItem] {
        &self.to_create
    }

    /// Ids that need a remote delete.
    pub fn to_delete(&self) -> &[ItemId] {
        &self.to_delete
    }

    /// Whether any confirmation calls are needed at all.
    pub fn is_settled(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    /// Fold the confirmation outcomes into the final working collection.
    ///
    /// The outcome slices are positionally matched with [`Self::to_create`]
    /// and [`Self::to_delete`]; missing outcomes count as failures.
    pub fn resolve(mut self, created: Vec<CallOutcome>, deleted: Vec<CallOutcome>) -> Collection {
        for (index, item) in self.to_create.iter().enumerate() {
            match created.get(index) {
                Some(Ok(())) => {
                    if let Some(entry) = self.merged.get_mut(&item.id) {
                        entry.state = SyncState::Synced;
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(id = %item.id, %err, "bootstrap create failed, kept unsynced");
                }
                None => {
                    tracing::warn!(id = %item.id, "bootstrap create unresolved, kept unsynced");
                }
            }
        }

        for (index, id) in self.to_delete.iter().enumerate() {
            match deleted.get(index) {
                Some(Ok(())) => {
                    self.merged.remove(id);
                }
                Some(Err(err)) => {
                    tracing::warn!(%id, %err, "bootstrap delete failed, tombstone kept");
                }
                None => {
                    tracing::warn!(%id, "bootstrap delete unresolved, tombstone kept");
                }
            }
        }

        self.merged
    }
}
