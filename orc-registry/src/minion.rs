use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use orc_core::types::Minion;
use orc_core::{ListParams, Result, WatchEvent, WatchParams};
use orc_store::Store;

use crate::generic::GenericRegistry;

/// Per-kind CRUD for `Minion`. Membership is static for this core: `orc-server`
/// seeds the bootstrap list through `create` at startup, and nothing else creates or
/// deletes one, but the registry does not special-case that — it is operational
/// discipline, not an enforced invariant.
#[derive(Clone)]
pub struct MinionRegistry {
    inner: GenericRegistry<Minion>,
}

impl MinionRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: GenericRegistry::new(store),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Minion> {
        self.inner.get(id).await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<Minion>> {
        self.inner.list(params).await
    }

    pub async fn create(&self, minion: Minion) -> Result<Minion> {
        self.inner.create(minion).await
    }

    pub async fn update(&self, minion: Minion) -> Result<Minion> {
        self.inner.update(minion).await
    }

    pub async fn delete(&self, id: &str) -> Result<Minion> {
        self.inner.delete(id).await
    }

    pub async fn watch(
        &self,
        params: &WatchParams,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<WatchEvent<Minion>>> + Send>>> {
        self.inner.watch(params).await
    }
}
