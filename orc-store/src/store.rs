use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;

/// The store's monotonic per-key index. `Create` assigns a fresh one; `Update` must
/// present the one last observed, or fail with `Conflict`.
pub type Index = u64;

/// A stored value together with the index it was written at.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: serde_json::Value,
    pub index: Index,
}

/// One change delivered by [`Store::watch`], in strictly increasing `index` order within
/// a key and sharing the store's global index ordering across keys.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// `created` distinguishes a fresh key (no prior entry) from an overwrite, so a layer
    /// mapping this to a typed watch event can tell `Added` from `Modified` without
    /// tracking its own view of prior state.
    Put { entry: Entry, created: bool },
    /// Carries the last known value before removal.
    Deleted(Entry),
}

impl ChangeEvent {
    pub fn index(&self) -> Index {
        match self {
            ChangeEvent::Put { entry, .. } | ChangeEvent::Deleted(entry) => entry.index,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ChangeEvent::Put { entry, .. } | ChangeEvent::Deleted(entry) => &entry.key,
        }
    }
}

pub type WatchStream = Pin<Box<dyn Stream<Item = Result<ChangeEvent>> + Send>>;

/// Thin, typed layer over a strongly consistent hierarchical key-value store supporting
/// compare-and-swap on a monotonic per-key index. The trait boundary is where a
/// real distributed store (etcd-alike) would be substituted for [`crate::mem::MemStore`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the current value and index for `key`.
    async fn get(&self, key: &str) -> Result<Entry>;

    /// Write `value` at `key`. `prev_index` is the compare-and-swap guard: `Some(n)`
    /// requires the stored index to currently be `n` (fails with `Conflict` otherwise),
    /// `None` requires the key to be absent (fresh create; fails with `Conflict` if it
    /// already exists, mirroring how `Create` reports `AlreadyExists` one layer up).
    async fn set(&self, key: &str, value: serde_json::Value, prev_index: Option<Index>) -> Result<Index>;

    /// Remove `key`. `prev_index` is the same CAS guard as `set`; `None` deletes
    /// unconditionally.
    async fn delete(&self, key: &str, prev_index: Option<Index>) -> Result<Entry>;

    /// All entries whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<Vec<Entry>>;

    /// Subscribe to changes under `prefix`. `since_index` resumes after that index if
    /// still within the store's retained window; `None` means "start from now".
    async fn watch(&self, prefix: &str, since_index: Option<Index>) -> Result<WatchStream>;
}
