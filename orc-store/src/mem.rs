use std::collections::BTreeMap;

use async_broadcast::{InactiveReceiver, Sender};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::retry::with_backoff;
use crate::store::{ChangeEvent, Entry, Index, Store, WatchStream};

/// Bound on the broadcast buffer the watch channel fans out through. A subscriber that
/// falls this far behind gets `RecvError::Overflowed` from `async-broadcast`, which the
/// multiplexer layer (`orc-runtime::watch`) turns into its "too slow" signal.
const WATCH_BUFFER: usize = 1024;

struct Inner {
    // A `BTreeMap` keeps `list` naturally key-ordered without a separate sort.
    values: BTreeMap<String, (serde_json::Value, Index)>,
    next_index: Index,
}

/// An in-process implementation of [`Store`] suitable for a single apiserver instance.
/// The trait boundary in `orc-store` is where a real distributed store (etcd-alike) would
/// be substituted; nothing above this module knows the difference.
pub struct MemStore {
    inner: Mutex<Inner>,
    changes: Mutex<Sender<ChangeEvent>>,
    _changes_rx: InactiveReceiver<ChangeEvent>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        let (mut tx, rx) = async_broadcast::broadcast(WATCH_BUFFER);
        tx.set_await_active(false);
        tx.set_overflow(true);
        Self {
            inner: Mutex::new(Inner {
                values: BTreeMap::new(),
                next_index: 1,
            }),
            changes: Mutex::new(tx),
            _changes_rx: rx.deactivate(),
        }
    }

    fn broadcast(&self, event: ChangeEvent) {
        // `try_broadcast` never blocks: with overflow enabled it drops the oldest buffered
        // item for slow subscribers instead, which is exactly the "too slow" contract the
        // multiplexer implements on top of this.
        let _ = self.changes.lock().try_broadcast(event);
    }
}

#[async_trait]
impl Store for MemStore {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Entry> {
        with_backoff(|| async {
            let inner = self.inner.lock();
            match inner.values.get(key) {
                Some((value, index)) => Ok(Entry {
                    key: key.to_string(),
                    value: value.clone(),
                    index: *index,
                }),
                None => Err(Error::NotFound(key.to_string())),
            }
        })
        .await
    }

    #[instrument(level = "debug", skip(self, value))]
    async fn set(&self, key: &str, value: serde_json::Value, prev_index: Option<Index>) -> Result<Index> {
        let (index, event) = with_backoff(|| async {
            let mut inner = self.inner.lock();
            let actual = inner.values.get(key).map(|(_, idx)| *idx);
            match (prev_index, actual) {
                (Some(expected), Some(actual)) if expected != actual => Err(Error::Conflict {
                    key: key.to_string(),
                    expected: Some(expected),
                    actual,
                }),
                (Some(expected), None) => Err(Error::Conflict {
                    key: key.to_string(),
                    expected: Some(expected),
                    actual: 0,
                }),
                (None, Some(actual)) => Err(Error::Conflict {
                    key: key.to_string(),
                    expected: None,
                    actual,
                }),
                _ => {
                    let created = actual.is_none();
                    let index = inner.next_index;
                    inner.next_index += 1;
                    inner.values.insert(key.to_string(), (value.clone(), index));
                    let entry = Entry {
                        key: key.to_string(),
                        value: value.clone(),
                        index,
                    };
                    Ok((index, ChangeEvent::Put { entry, created }))
                }
            }
        })
        .await?;
        self.broadcast(event);
        Ok(index)
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete(&self, key: &str, prev_index: Option<Index>) -> Result<Entry> {
        let (entry, event) = with_backoff(|| async {
            let mut inner = self.inner.lock();
            match inner.values.get(key).cloned() {
                None => Err(Error::NotFound(key.to_string())),
                Some((value, actual)) => {
                    if let Some(expected) = prev_index {
                        if expected != actual {
                            return Err(Error::Conflict {
                                key: key.to_string(),
                                expected: Some(expected),
                                actual,
                            });
                        }
                    }
                    inner.values.remove(key);
                    let entry = Entry {
                        key: key.to_string(),
                        value,
                        index: actual,
                    };
                    Ok((entry.clone(), ChangeEvent::Deleted(entry)))
                }
            }
        })
        .await?;
        self.broadcast(event);
        Ok(entry)
    }

    #[instrument(level = "debug", skip(self))]
    async fn list(&self, prefix: &str) -> Result<Vec<Entry>> {
        with_backoff(|| async {
            let inner = self.inner.lock();
            Ok(inner
                .values
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, (value, index))| Entry {
                    key: key.clone(),
                    value: value.clone(),
                    index: *index,
                })
                .collect())
        })
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn watch(&self, prefix: &str, since_index: Option<Index>) -> Result<WatchStream> {
        let prefix = prefix.to_string();
        let rx = self.changes.lock().new_receiver();
        let backlog: Vec<ChangeEvent> = match since_index {
            Some(since) => {
                let inner = self.inner.lock();
                inner
                    .values
                    .iter()
                    .filter(|(key, (_, index))| key.starts_with(&prefix) && *index > since)
                    .map(|(key, (value, index))| {
                        // Replaying from a snapshot loses whether each entry was
                        // originally a create or an update; `created: false` is the safe
                        // default (a late joiner gets `Modified`, never a spurious `Added`
                        // for something that existed before it joined).
                        ChangeEvent::Put {
                            entry: Entry {
                                key: key.clone(),
                                value: value.clone(),
                                index: *index,
                            },
                            created: false,
                        }
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        // `recv()` (rather than the `Stream` impl) is what surfaces `RecvError::Overflowed`
        // to us — the `Stream` impl silently skips missed items, which would hide exactly
        // the "subscriber fell behind" condition the multiplexer needs to detect.
        let live = async_stream::stream! {
            let mut rx = rx;
            loop {
                match rx.recv().await {
                    Ok(event) if event.key().starts_with(&prefix) => yield Ok(event),
                    Ok(_) => continue,
                    Err(async_broadcast::RecvError::Overflowed(_)) => {
                        yield Err(Error::Transient("watch subscriber overflowed".into()));
                        return;
                    }
                    Err(async_broadcast::RecvError::Closed) => return,
                }
            }
        };

        let stream = StreamExt::chain(tokio_stream::iter(backlog.into_iter().map(Ok)), live);
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemStore::new();
        let index = store.set("pods/a", serde_json::json!({"x": 1}), None).await.unwrap();
        assert_eq!(index, 1);
        let entry = store.get("pods/a").await.unwrap();
        assert_eq!(entry.value, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemStore::new();
        assert!(matches!(store.get("nope").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn cas_rejects_stale_index() {
        let store = MemStore::new();
        store.set("k", serde_json::json!(1), None).await.unwrap();
        let result = store.set("k", serde_json::json!(2), Some(999)).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
    }

    #[tokio::test]
    async fn create_with_prev_index_fails_if_missing() {
        let store = MemStore::new();
        let result = store.set("k", serde_json::json!(1), Some(1)).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemStore::new();
        store.set("pods/a", serde_json::json!(1), None).await.unwrap();
        store.set("pods/b", serde_json::json!(2), None).await.unwrap();
        store.set("services/a", serde_json::json!(3), None).await.unwrap();
        let entries = store.list("pods/").await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn delete_is_terminal_and_observed_by_watch() {
        let store = MemStore::new();
        store.set("pods/a", serde_json::json!({"x": 1}), None).await.unwrap();
        let mut watch = store.watch("pods/", None).await.unwrap();
        store.delete("pods/a", None).await.unwrap();
        let event = watch.next().await.unwrap().unwrap();
        assert!(matches!(event, ChangeEvent::Deleted(_)));
        assert!(matches!(store.get("pods/a").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn watch_resumes_from_since_index() {
        let store = MemStore::new();
        let first = store.set("pods/a", serde_json::json!(1), None).await.unwrap();
        store.set("pods/b", serde_json::json!(2), None).await.unwrap();
        let mut watch = store.watch("pods/", Some(first)).await.unwrap();
        let event = watch.next().await.unwrap().unwrap();
        assert_eq!(event.key(), "pods/b");
    }
}
