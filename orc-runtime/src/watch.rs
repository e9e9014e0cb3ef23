//! Shares one underlying `Store::watch` subscription per kind across every consumer
//! watching that kind — REST watch clients and the control loops alike — instead of each
//! opening its own.
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use async_broadcast::{InactiveReceiver, RecvError, Sender};
use futures::{Stream, StreamExt};
use orc_core::codec;
use orc_core::meta::{Resource, ResourceExt};
use orc_core::params::FieldIndexable;
use orc_core::{Error, ListParams, Result as CoreResult, WatchEvent, WatchParams};
use orc_store::{ChangeEvent, Store};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

/// Bound on the broadcast buffer every subscriber shares. A subscriber that falls this far
/// behind gets `RecvError::Overflowed`, which `subscribe` turns into a "too slow" signal.
const DISPATCH_BUFFER: usize = 1024;

/// One shared watch over a single kind's key prefix. Construct one per kind at server
/// startup and clone it (it's cheap: an `Arc`-backed sender plus a background pump task)
/// into the REST surface and whichever control loops watch that kind.
pub struct WatchMultiplexer<K> {
    store: Arc<dyn Store>,
    prefix: String,
    tx: Sender<Arc<WatchEvent<K>>>,
    _rx: InactiveReceiver<Arc<WatchEvent<K>>>,
    _pump: Arc<JoinHandle<()>>,
    _marker: PhantomData<fn() -> K>,
}

impl<K> Clone for WatchMultiplexer<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            prefix: self.prefix.clone(),
            tx: self.tx.clone(),
            _rx: self.tx.new_receiver().deactivate(),
            _pump: self._pump.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K> WatchMultiplexer<K>
where
    K: Resource + FieldIndexable + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Opens the one upstream `store.watch` for this kind and starts pumping it into the
    /// broadcast channel every subscriber reads from. The pump runs for the lifetime of the
    /// returned handle (and every clone of it).
    pub fn spawn(store: Arc<dyn Store>) -> Self {
        let prefix = format!("{}/", K::PLURAL);
        let (mut tx, rx) = async_broadcast::broadcast(DISPATCH_BUFFER);
        tx.set_await_active(false);
        tx.set_overflow(true);
        let pump = tokio::spawn(Self::pump(store.clone(), prefix.clone(), tx.clone()));
        Self {
            store,
            prefix,
            tx,
            _rx: rx.deactivate(),
            _pump: Arc::new(pump),
            _marker: PhantomData,
        }
    }

    async fn pump(store: Arc<dyn Store>, prefix: String, tx: Sender<Arc<WatchEvent<K>>>) {
        let mut upstream = match store.watch(&prefix, None).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%prefix, %err, "watch multiplexer failed to open its upstream store watch");
                return;
            }
        };
        while let Some(result) = upstream.next().await {
            let change = match result {
                Ok(change) => change,
                Err(err) => {
                    warn!(%prefix, %err, "upstream store watch failed; multiplexer pump exiting");
                    return;
                }
            };
            match decode_change::<K>(&change) {
                Ok(event) => {
                    let _ = tx.try_broadcast(Arc::new(event));
                }
                Err(err) => warn!(%prefix, %err, "failed to decode a watched change; dropping it"),
            }
        }
    }

    /// Opens a filtered view of this kind's watch. A caller with no `since_version`
    /// subscribes to the shared live broadcast; a caller resuming after an index —
    /// including one reopening after the "too slow" signal below — replays directly from
    /// the store instead, since the in-process store retains its full history and a direct
    /// store watch already performs exactly that replay.
    #[instrument(level = "debug", skip(self, params), fields(kind = K::KIND))]
    pub async fn subscribe(
        &self,
        params: &WatchParams,
    ) -> CoreResult<Pin<Box<dyn Stream<Item = CoreResult<WatchEvent<K>>> + Send>>> {
        if let Some(since) = params.since_version {
            return self.replay_from_store(since, params.list.clone()).await;
        }

        let list_params = params.list.clone();
        let mut rx = self.tx.new_receiver();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if matches_event(&*event, &list_params) {
                            yield Ok((*event).clone());
                        }
                    }
                    Err(RecvError::Overflowed(_)) => {
                        yield Err(Error::ServerTimeout(
                            "watch subscriber fell behind; reopen with the last resourceVersion seen".into(),
                        ));
                        return;
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn replay_from_store(
        &self,
        since: u64,
        list_params: ListParams,
    ) -> CoreResult<Pin<Box<dyn Stream<Item = CoreResult<WatchEvent<K>>> + Send>>> {
        let stream = self
            .store
            .watch(&self.prefix, Some(since))
            .await
            .map_err(|e| translate_store_err(e, K::KIND))?;
        let mapped = stream.filter_map(move |result| {
            let list_params = list_params.clone();
            async move {
                match result {
                    Ok(change) => match decode_change::<K>(&change) {
                        Ok(event) if matches_event(&event, &list_params) => Some(Ok(event)),
                        Ok(_) => None,
                        Err(err) => Some(Err(err)),
                    },
                    Err(err) => Some(Err(translate_store_err(err, K::KIND))),
                }
            }
        });
        Ok(Box::pin(mapped))
    }
}

fn decode_change<K>(change: &ChangeEvent) -> CoreResult<WatchEvent<K>>
where
    K: Resource + DeserializeOwned,
{
    match change {
        ChangeEvent::Put { entry, created } => {
            let mut obj: K = codec::decode(entry.value.clone()).map_err(|e| Error::Internal(e.to_string()))?;
            codec::stamp_resource_version(&mut obj, entry.index);
            Ok(if *created {
                WatchEvent::Added(obj)
            } else {
                WatchEvent::Modified(obj)
            })
        }
        ChangeEvent::Deleted(entry) => {
            let mut obj: K = codec::decode(entry.value.clone()).map_err(|e| Error::Internal(e.to_string()))?;
            codec::stamp_resource_version(&mut obj, entry.index);
            Ok(WatchEvent::Deleted(obj))
        }
    }
}

fn matches_event<K>(event: &WatchEvent<K>, params: &ListParams) -> bool
where
    K: Resource + ResourceExt + FieldIndexable,
{
    let Some(obj) = event.object() else {
        return true;
    };
    if !params.label_selector.matches(obj.labels()) {
        return false;
    }
    match &params.field_selector {
        Some(field_sel) => field_sel.matches(obj.id(), obj.status_host()),
        None => true,
    }
}

fn translate_store_err(err: orc_store::Error, kind: &'static str) -> Error {
    match err {
        orc_store::Error::NotFound(key) => Error::NotFound { kind, id: key },
        orc_store::Error::Conflict { .. } => Error::Internal("unexpected conflict on a watch replay".into()),
        orc_store::Error::Transient(msg) => Error::ServerTimeout(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_core::types::Pod;
    use orc_core::ObjectMeta;
    use orc_store::MemStore;

    fn pod(id: &str) -> serde_json::Value {
        serde_json::to_value(Pod {
            metadata: ObjectMeta::new(id),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn live_subscriber_sees_subsequent_writes() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        let mux = WatchMultiplexer::<Pod>::spawn(store.clone());
        // give the pump task a chance to open its upstream watch before the write happens
        tokio::task::yield_now().await;
        let mut stream = mux.subscribe(&WatchParams::default()).await.unwrap();
        store.set("pods/a", pod("a"), None).await.unwrap();
        let event = stream.next().await.unwrap().unwrap();
        assert!(matches!(event, WatchEvent::Added(_)));
    }

    #[tokio::test]
    async fn since_version_replays_directly_from_store() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        let first = store.set("pods/a", pod("a"), None).await.unwrap();
        store.set("pods/b", pod("b"), None).await.unwrap();
        let mux = WatchMultiplexer::<Pod>::spawn(store.clone());
        let params = WatchParams {
            since_version: Some(first),
            ..Default::default()
        };
        let mut stream = mux.subscribe(&params).await.unwrap();
        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(event.object().unwrap().metadata.id, "b");
    }
}
