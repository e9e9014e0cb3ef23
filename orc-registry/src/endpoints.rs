use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use orc_core::types::Endpoints;
use orc_core::{ListParams, Result, WatchEvent, WatchParams};
use orc_store::Store;

use crate::generic::GenericRegistry;

/// Per-kind CRUD for `Endpoints`. Ordinarily written only by the endpoints controller,
/// but the registry does not reject writes from any other caller — writes from any actor
/// other than the endpoints controller must still succeed, since the controller
/// always re-reads the current object before writing, so its CAS-guarded write is the one
/// that ends up winning on the next reconcile pass regardless of who wrote last.
#[derive(Clone)]
pub struct EndpointsRegistry {
    inner: GenericRegistry<Endpoints>,
}

impl EndpointsRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: GenericRegistry::new(store),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Endpoints> {
        self.inner.get(id).await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<Endpoints>> {
        self.inner.list(params).await
    }

    pub async fn create(&self, endpoints: Endpoints) -> Result<Endpoints> {
        self.inner.create(endpoints).await
    }

    pub async fn update(&self, endpoints: Endpoints) -> Result<Endpoints> {
        self.inner.update(endpoints).await
    }

    pub async fn delete(&self, id: &str) -> Result<Endpoints> {
        self.inner.delete(id).await
    }

    pub async fn watch(
        &self,
        params: &WatchParams,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<WatchEvent<Endpoints>>> + Send>>> {
        self.inner.watch(params).await
    }
}
