//! The in-memory item collection.
//!
//! Keyed by id so that duplicate ids are unrepresentable, with an explicit
//! ordering vector so the display order the user created survives restarts
//! (the persisted snapshot is an ordered array). All mutation goes through
//! the owning engine loop; the collection itself is plain data.

use std::collections::HashMap;

use crate::error::Result;
use crate::item::{Item, StoredItem, SyncState};
use crate::ItemId;

/// Id-keyed collection of items with stable insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    items: HashMap<ItemId, Item>,
    order: Vec<ItemId>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an item by id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    /// Get a mutable item by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    /// Check if an item exists (including tombstoned).
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Insert an item. A new id is appended to the order; re-inserting an
    /// existing id replaces the item in place, keeping its position.
    pub fn insert(&mut self, item: Item) {
        if !self.items.contains_key(&item.id) {
            self.order.push(item.id.clone());
        }
        self.items.insert(item.id.clone(), item);
    }

    /// Remove an item entirely, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Item> {
        let removed = self.items.remove(id);
        if removed.is_some() {
            self.order.retain(|existing| existing != id);
        }
        removed
    }

    /// All items in insertion order, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// The consumer-facing view: insertion order, tombstones filtered out.
    pub fn visible(&self) -> impl Iterator<Item = &Item> {
        self.iter().filter(|item| item.is_visible())
    }

    /// Count of visible items.
    pub fn len(&self) -> usize {
        self.visible().count()
    }

    /// Check whether the collection has no visible items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of all items, tombstones included.
    pub fn total_len(&self) -> usize {
        self.items.len()
    }

    /// True iff no item holds unsaved work.
    ///
    /// Pending or in-flight deletes do not block the indicator; the data is
    /// already on the server.
    pub fn fully_synced(&self) -> bool {
        self.items.values().all(|item| item.state.counts_as_synced())
    }

    /// Serialize the full collection (tombstones and unsaved items included)
    /// to the persisted snapshot format: one ordered JSON array of
    /// five-field records.
    pub fn to_snapshot_json(&self) -> Result<String> {
        let stored: Vec<StoredItem> = self.iter().map(StoredItem::from).collect();
        Ok(serde_json::to_string(&stored)?)
    }

    /// Decode a persisted snapshot.
    ///
    /// In-flight states are settled (nothing survives a restart mid-request)
    /// and duplicate ids are dropped, first occurrence wins.
    pub fn from_snapshot_json(json: &str) -> Result<Self> {
        let stored: Vec<StoredItem> = serde_json::from_str(json)?;
        let mut collection = Self::new();
        for entry in stored {
            let mut item = Item::from(entry);
            item.state = item.state.settle();
            if collection.contains(&item.id) {
                tracing::warn!(id = %item.id, "duplicate id in local snapshot, keeping first");
                continue;
            }
            collection.insert(item);
        }
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collection_with(states: &[(&str, SyncState)]) -> Collection {
        let mut collection = Collection::new();
        for (id, state) in states {
            collection.insert(Item::new(*id, format!("value-{id}"), *state));
        }
        collection
    }

    #[test]
    fn insert_preserves_order() {
        let collection = collection_with(&[
            ("c", SyncState::Synced),
            ("a", SyncState::Synced),
            ("b", SyncState::Synced),
        ]);
        let ids: Vec<_> = collection.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut collection = collection_with(&[
            ("a", SyncState::Creating),
            ("b", SyncState::Synced),
        ]);
        collection.insert(Item::new("a", "updated", SyncState::Synced));

        let ids: Vec<_> = collection.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(collection.get("a").unwrap().state, SyncState::Synced);
        assert_eq!(collection.total_len(), 2);
    }

    #[test]
    fn visible_filters_every_deleted_state() {
        let collection = collection_with(&[
            ("a", SyncState::Synced),
            ("b", SyncState::Tombstoned),
            ("c", SyncState::Deleting),
            ("d", SyncState::Unsynced),
        ]);
        let ids: Vec<_> = collection.visible().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["a", "d"]);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.total_len(), 4);
    }

    #[test]
    fn fully_synced_tracks_unsaved_work_only() {
        let mut collection = collection_with(&[("a", SyncState::Synced)]);
        assert!(collection.fully_synced());

        collection.insert(Item::new("b", "x", SyncState::Creating));
        assert!(!collection.fully_synced());

        collection.get_mut("b").unwrap().state = SyncState::Synced;
        assert!(collection.fully_synced());

        // A pending delete does not flip the indicator.
        collection.get_mut("a").unwrap().state = SyncState::Tombstoned;
        assert!(collection.fully_synced());
    }

    #[test]
    fn snapshot_roundtrip_keeps_tombstones_and_order() {
        let collection = collection_with(&[
            ("b", SyncState::Tombstoned),
            ("a", SyncState::Unsynced),
            ("c", SyncState::Synced),
        ]);

        let json = collection.to_snapshot_json().unwrap();
        let restored = Collection::from_snapshot_json(&json).unwrap();

        assert_eq!(restored, collection);
        let ids: Vec<_> = restored.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn snapshot_decode_settles_in_flight_states() {
        let json = r#"[
            {"id":"a","value":"x","saved":false,"saving":true,"deleted":false},
            {"id":"b","value":"y","saved":true,"saving":true,"deleted":true}
        ]"#;
        let collection = Collection::from_snapshot_json(json).unwrap();
        assert_eq!(collection.get("a").unwrap().state, SyncState::Unsynced);
        assert_eq!(collection.get("b").unwrap().state, SyncState::Tombstoned);
    }

    #[test]
    fn snapshot_decode_drops_duplicate_ids() {
        let json = r#"[
            {"id":"a","value":"first","saved":true,"saving":false,"deleted":false},
            {"id":"a","value":"second","saved":false,"saving":false,"deleted":false}
        ]"#;
        let collection = Collection::from_snapshot_json(json).unwrap();
        assert_eq!(collection.total_len(), 1);
        assert_eq!(collection.get("a").unwrap().value, "first");
    }

    #[test]
    fn snapshot_decode_rejects_garbage() {
        assert!(Collection::from_snapshot_json("not json").is_err());
        assert!(Collection::from_snapshot_json(r#"{"id":"a"}"#).is_err());
    }

    #[test]
    fn empty_snapshot_is_empty_collection() {
        let collection = Collection::from_snapshot_json("[]").unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.total_len(), 0);
    }

    // No sequence of inserts and removes can produce duplicate ids.
    proptest! {
        #[test]
        fn prop_no_duplicate_ids(ops in proptest::collection::vec((0u8..8, any::<bool>()), 0..64)) {
            let mut collection = Collection::new();
            for (id, is_insert) in ops {
                let id = format!("item-{id}");
                if is_insert {
                    collection.insert(Item::new(id, "v", SyncState::Unsynced));
                } else {
                    collection.remove(&id);
                }

                let mut seen: Vec<&str> = collection.iter().map(|item| item.id.as_str()).collect();
                let unique_before = seen.len();
                seen.sort_unstable();
                seen.dedup();
                prop_assert_eq!(unique_before, seen.len());
                prop_assert_eq!(collection.iter().count(), collection.total_len());
            }
        }
    }
}
