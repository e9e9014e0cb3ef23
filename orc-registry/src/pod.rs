use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use orc_core::types::Pod;
use orc_core::{ListParams, Result, WatchEvent, WatchParams};
use orc_store::Store;

use crate::generic::GenericRegistry;

/// Per-kind CRUD for `Pod`. No kind-specific invariant beyond the generic one —
/// the `status.host` immutability rule is enforced by the scheduler and the
/// replication controller manager choosing never to touch it after the first bind, not by
/// a registry-level check.
#[derive(Clone)]
pub struct PodRegistry {
    inner: GenericRegistry<Pod>,
}

impl PodRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: GenericRegistry::new(store),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Pod> {
        self.inner.get(id).await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<Pod>> {
        self.inner.list(params).await
    }

    pub async fn create(&self, pod: Pod) -> Result<Pod> {
        self.inner.create(pod).await
    }

    pub async fn update(&self, pod: Pod) -> Result<Pod> {
        self.inner.update(pod).await
    }

    pub async fn delete(&self, id: &str) -> Result<Pod> {
        self.inner.delete(id).await
    }

    pub async fn watch(&self, params: &WatchParams) -> Result<Pin<Box<dyn Stream<Item = Result<WatchEvent<Pod>>> + Send>>> {
        self.inner.watch(params).await
    }
}
