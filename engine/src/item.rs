//! Item types and their sync lifecycle.
//!
//! Earlier snapshots tracked sync progress as three independent booleans
//! (`saved`, `saving`, `deleted`), which can represent combinations that
//! never occur. [`SyncState`] replaces them with a tagged state, so illegal
//! combinations are unrepresentable in memory. The persisted format keeps
//! the five-field record for compatibility; [`StoredItem`] bridges the two.

use crate::ItemId;
use serde::{Deserialize, Serialize};

/// Where an item is in its sync lifecycle.
///
/// Transitions:
///
/// ```text
/// add_item ─────────▶ Creating ──ok──▶ Synced ──remove──▶ Deleting ──ok──▶ (gone)
///                        │ err                               │ err
///                        ▼                                   ▼
///                     Unsynced ──(next bootstrap retry)   Tombstoned ──(next bootstrap retry)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Exists locally only; no request in flight. Retried at next bootstrap.
    Unsynced,
    /// A remote create for this item is in flight.
    Creating,
    /// The remote store is known to hold this item.
    Synced,
    /// A remote delete for this item is in flight.
    Deleting,
    /// Marked for removal; the remote delete has not been confirmed yet.
    /// Retained locally so the delete survives a restart.
    Tombstoned,
}

impl SyncState {
    /// True for tombstoned-or-deleting items, which are hidden from consumers.
    pub fn is_deleted(self) -> bool {
        matches!(self, SyncState::Deleting | SyncState::Tombstoned)
    }

    /// True iff a remote request for this item is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, SyncState::Creating | SyncState::Deleting)
    }

    /// Whether this item counts toward the "fully synced" indicator.
    ///
    /// Only unsaved work blocks the indicator; an in-flight or pending
    /// delete does not (the item is already on the server).
    pub fn counts_as_synced(self) -> bool {
        !matches!(self, SyncState::Unsynced | SyncState::Creating)
    }

    /// Collapse in-flight states after a restart.
    ///
    /// `Creating`/`Deleting` imply an outstanding request, which cannot
    /// survive the process; a loaded snapshot downgrades them to their
    /// settled pending forms.
    pub fn settle(self) -> Self {
        match self {
            SyncState::Creating => SyncState::Unsynced,
            SyncState::Deleting => SyncState::Tombstoned,
            other => other,
        }
    }
}

/// A single user item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Opaque unique id, client-generated, stable once assigned.
    pub id: ItemId,
    /// Free-form text content.
    pub value: String,
    /// Current sync lifecycle state.
    pub state: SyncState,
}

impl Item {
    /// Create an item in a given state.
    pub fn new(id: impl Into<ItemId>, value: impl Into<String>, state: SyncState) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            state,
        }
    }

    /// An item adopted from the remote list.
    pub fn synced(id: impl Into<ItemId>, value: impl Into<String>) -> Self {
        Self::new(id, value, SyncState::Synced)
    }

    /// True if the item should be shown to consumers.
    pub fn is_visible(&self) -> bool {
        !self.state.is_deleted()
    }
}

/// The wire shape of an item on the remote store: id and value only.
///
/// Sync-state flags are a local concern; everything the remote holds is by
/// definition saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub id: ItemId,
    pub value: String,
}

impl RemoteItem {
    pub fn new(id: impl Into<ItemId>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

impl From<&Item> for RemoteItem {
    fn from(item: &Item) -> Self {
        Self::new(item.id.clone(), item.value.clone())
    }
}

/// The persisted representation of an item: the legacy five-field record.
///
/// Snapshots written before the tagged-state rework decode losslessly;
/// unknown flag combinations collapse into the nearest legal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredItem {
    pub id: ItemId,
    pub value: String,
    pub saved: bool,
    pub saving: bool,
    pub deleted: bool,
}

impl From<&Item> for StoredItem {
    fn from(item: &Item) -> Self {
        let (saved, saving, deleted) = match item.state {
            SyncState::Unsynced => (false, false, false),
            SyncState::Creating => (false, true, false),
            SyncState::Synced => (true, false, false),
            SyncState::Deleting => (true, true, true),
            SyncState::Tombstoned => (true, false, true),
        };
        Self {
            id: item.id.clone(),
            value: item.value.clone(),
            saved,
            saving,
            deleted,
        }
    }
}

impl From<StoredItem> for Item {
    fn from(stored: StoredItem) -> Self {
        // A tombstone is only ever set on a saved item, so `deleted` wins
        // over the other flags when decoding.
        let state = if stored.deleted {
            if stored.saving {
                SyncState::Deleting
            } else {
                SyncState::Tombstoned
            }
        } else if stored.saved {
            SyncState::Synced
        } else if stored.saving {
            SyncState::Creating
        } else {
            SyncState::Unsynced
        };
        Item {
            id: stored.id,
            value: stored.value,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_follows_tombstones() {
        assert!(Item::new("a", "x", SyncState::Unsynced).is_visible());
        assert!(Item::new("a", "x", SyncState::Creating).is_visible());
        assert!(Item::new("a", "x", SyncState::Synced).is_visible());
        assert!(!Item::new("a", "x", SyncState::Deleting).is_visible());
        assert!(!Item::new("a", "x", SyncState::Tombstoned).is_visible());
    }

    #[test]
    fn sync_indicator_ignores_deletes() {
        assert!(!SyncState::Unsynced.counts_as_synced());
        assert!(!SyncState::Creating.counts_as_synced());
        assert!(SyncState::Synced.counts_as_synced());
        assert!(SyncState::Deleting.counts_as_synced());
        assert!(SyncState::Tombstoned.counts_as_synced());
    }

    #[test]
    fn settle_clears_in_flight_states() {
        assert_eq!(SyncState::Creating.settle(), SyncState::Unsynced);
        assert_eq!(SyncState::Deleting.settle(), SyncState::Tombstoned);
        assert_eq!(SyncState::Synced.settle(), SyncState::Synced);
        assert_eq!(SyncState::Unsynced.settle(), SyncState::Unsynced);
        assert_eq!(SyncState::Tombstoned.settle(), SyncState::Tombstoned);
    }

    #[test]
    fn stored_roundtrip_for_every_state() {
        for state in [
            SyncState::Unsynced,
            SyncState::Creating,
            SyncState::Synced,
            SyncState::Deleting,
            SyncState::Tombstoned,
        ] {
            let item = Item::new("item-1", "buy milk", state);
            let stored = StoredItem::from(&item);
            let back = Item::from(stored);
            assert_eq!(back, item, "state {state:?} did not survive the bridge");
        }
    }

    #[test]
    fn stored_format_keeps_legacy_field_names() {
        let item = Item::new("item-1", "buy milk", SyncState::Creating);
        let json = serde_json::to_string(&StoredItem::from(&item)).unwrap();
        assert!(json.contains("\"saved\":false"));
        assert!(json.contains("\"saving\":true"));
        assert!(json.contains("\"deleted\":false"));
    }

    #[test]
    fn decode_accepts_illegal_flag_combinations() {
        // saved+saving+!deleted never occurs, but old snapshots are adopted
        // rather than rejected: saved wins.
        let stored: StoredItem = serde_json::from_str(
            r#"{"id":"a","value":"x","saved":true,"saving":true,"deleted":false}"#,
        )
        .unwrap();
        assert_eq!(Item::from(stored).state, SyncState::Synced);

        // deleted on an unsaved record is adopted as a tombstone.
        let stored: StoredItem = serde_json::from_str(
            r#"{"id":"a","value":"x","saved":false,"saving":false,"deleted":true}"#,
        )
        .unwrap();
        assert_eq!(Item::from(stored).state, SyncState::Tombstoned);
    }
}
