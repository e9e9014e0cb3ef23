use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, StreamExt};
use orc_core::codec;
use orc_core::meta::{Resource, ResourceExt};
use orc_core::params::FieldIndexable;
use orc_core::{Error, ListParams, Result as CoreResult, WatchEvent, WatchParams};
use orc_store::{ChangeEvent, Store};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::error::{internal_err, translate};

/// The CRUD surface common to every kind, generic over a concrete `K` and
/// parameterized by the store prefix `K::PLURAL` already gives us. Kind-specific
/// invariants (RC's stop-before-delete, Service's cascading `Endpoints` creation,
/// Endpoints' controller-wins CAS) are layered on top in the per-kind modules, which hold
/// one of these rather than reimplementing it.
pub(crate) struct GenericRegistry<K> {
    store: Arc<dyn Store>,
    _marker: PhantomData<fn() -> K>,
}

impl<K> Clone for GenericRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K> GenericRegistry<K>
where
    K: Resource + FieldIndexable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    fn prefix(&self) -> String {
        format!("{}/", K::PLURAL)
    }

    fn key(&self, id: &str) -> String {
        format!("{}/{id}", K::PLURAL)
    }

    fn decode_entry(&self, value: serde_json::Value, index: u64) -> CoreResult<K> {
        let mut obj: K = codec::decode(value).map_err(internal_err)?;
        codec::stamp_resource_version(&mut obj, index);
        Ok(obj)
    }

    #[instrument(level = "debug", skip(self), fields(kind = K::KIND))]
    pub(crate) async fn get(&self, id: &str) -> CoreResult<K> {
        let entry = self
            .store
            .get(&self.key(id))
            .await
            .map_err(|e| translate(e, K::KIND, id))?;
        self.decode_entry(entry.value, entry.index)
    }

    #[instrument(level = "debug", skip(self, params), fields(kind = K::KIND))]
    pub(crate) async fn list(&self, params: &ListParams) -> CoreResult<Vec<K>> {
        let entries = self
            .store
            .list(&self.prefix())
            .await
            .map_err(|e| translate(e, K::KIND, ""))?;
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let obj = self.decode_entry(entry.value, entry.index)?;
            if matches_params(&obj, params) {
                out.push(obj);
            }
        }
        Ok(out)
    }

    /// Fails with `AlreadyExists` if `id` is taken; fills in `creationTimestamp` and
    /// `resourceVersion`.
    #[instrument(level = "debug", skip(self, obj), fields(kind = K::KIND, id = obj.id()))]
    pub(crate) async fn create(&self, mut obj: K) -> CoreResult<K> {
        let id = obj.id().to_string();
        obj.meta_mut().creation_timestamp = Some(Utc::now());
        obj.meta_mut().resource_version = None;
        let value = codec::encode(&obj).map_err(internal_err)?;
        match self.store.set(&self.key(&id), value, None).await {
            Ok(index) => {
                codec::stamp_resource_version(&mut obj, index);
                Ok(obj)
            }
            Err(orc_store::Error::Conflict { .. }) => Err(Error::AlreadyExists { kind: K::KIND, id }),
            Err(e) => Err(translate(e, K::KIND, &id)),
        }
    }

    /// Fails with `Conflict` if the caller's `resourceVersion` does not match stored;
    /// with `NotFound` if the object is absent.
    #[instrument(level = "debug", skip(self, obj), fields(kind = K::KIND, id = obj.id()))]
    pub(crate) async fn update(&self, mut obj: K) -> CoreResult<K> {
        let id = obj.id().to_string();
        let key = self.key(&id);
        // Existence is checked up front so an update against a never-created id reports
        // NotFound rather than the Conflict a bare CAS mismatch would otherwise produce.
        self.store.get(&key).await.map_err(|e| translate(e, K::KIND, &id))?;
        let expected = obj.resource_version().and_then(codec::parse_resource_version);
        let value = codec::encode(&obj).map_err(internal_err)?;
        match self.store.set(&key, value, expected).await {
            Ok(index) => {
                codec::stamp_resource_version(&mut obj, index);
                Ok(obj)
            }
            Err(orc_store::Error::Conflict { .. }) => Err(Error::Conflict {
                kind: K::KIND,
                id,
                reason: "resourceVersion mismatch".to_string(),
            }),
            Err(e) => Err(translate(e, K::KIND, &id)),
        }
    }

    /// Fails with `NotFound` if absent.
    #[instrument(level = "debug", skip(self), fields(kind = K::KIND))]
    pub(crate) async fn delete(&self, id: &str) -> CoreResult<K> {
        let entry = self
            .store
            .delete(&self.key(id), None)
            .await
            .map_err(|e| translate(e, K::KIND, id))?;
        self.decode_entry(entry.value, entry.index)
    }

    #[instrument(level = "debug", skip(self, params), fields(kind = K::KIND))]
    pub(crate) async fn watch(
        &self,
        params: &WatchParams,
    ) -> CoreResult<Pin<Box<dyn Stream<Item = CoreResult<WatchEvent<K>>> + Send>>> {
        let stream = self
            .store
            .watch(&self.prefix(), params.since_version)
            .await
            .map_err(|e| translate(e, K::KIND, ""))?;
        let list_params = params.list.clone();
        let kind = K::KIND;
        let mapped = stream.filter_map(move |result| {
            let list_params = list_params.clone();
            async move {
                match result {
                    Ok(ChangeEvent::Put { entry, created }) => match decode_for_watch::<K>(entry.value, entry.index) {
                        Ok(obj) if matches_params(&obj, &list_params) => Some(Ok(if created {
                            WatchEvent::Added(obj)
                        } else {
                            WatchEvent::Modified(obj)
                        })),
                        Ok(_) => None,
                        Err(e) => Some(Err(e)),
                    },
                    Ok(ChangeEvent::Deleted(entry)) => match decode_for_watch::<K>(entry.value, entry.index) {
                        Ok(obj) if matches_params(&obj, &list_params) => Some(Ok(WatchEvent::Deleted(obj))),
                        Ok(_) => None,
                        Err(e) => Some(Err(e)),
                    },
                    Err(e) => Some(Err(translate(e, kind, ""))),
                }
            }
        });
        Ok(Box::pin(mapped))
    }
}

fn decode_for_watch<K>(value: serde_json::Value, index: u64) -> CoreResult<K>
where
    K: Resource + DeserializeOwned,
{
    let mut obj: K = codec::decode(value).map_err(internal_err)?;
    codec::stamp_resource_version(&mut obj, index);
    Ok(obj)
}

fn matches_params<K>(obj: &K, params: &ListParams) -> bool
where
    K: Resource + ResourceExt + FieldIndexable,
{
    if !params.label_selector.matches(obj.labels()) {
        return false;
    }
    match &params.field_selector {
        Some(field_sel) => field_sel.matches(obj.id(), obj.status_host()),
        None => true,
    }
}
