use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use orc_core::meta::{ObjectMeta, ResourceExt};
use orc_core::types::{Endpoints, Service};
use orc_core::{ListParams, Result, WatchEvent, WatchParams};
use orc_store::Store;

use crate::endpoints::EndpointsRegistry;
use crate::generic::GenericRegistry;

/// Per-kind CRUD for `Service`, adding the one kind-specific rule: `Create`
/// also creates an empty `Endpoints` object with the same id, for the endpoints
/// controller to fill in as matching pods come up.
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: GenericRegistry<Service>,
    endpoints: EndpointsRegistry,
}

impl ServiceRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: GenericRegistry::new(store.clone()),
            endpoints: EndpointsRegistry::new(store),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Service> {
        self.inner.get(id).await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<Service>> {
        self.inner.list(params).await
    }

    pub async fn create(&self, svc: Service) -> Result<Service> {
        let id = svc.id().to_string();
        let created = self.inner.create(svc).await?;
        let empty = Endpoints {
            metadata: ObjectMeta::new(id.clone()),
            subsets: Vec::new(),
        };
        // Best-effort: there is no cross-key transaction in this store, so a failure here
        // is logged rather than rolled back. The endpoints controller's first reconcile
        // pass for this service will create the object anyway if it is still missing.
        if let Err(err) = self.endpoints.create(empty).await {
            tracing::warn!(service_id = %id, %err, "failed to create cascading Endpoints object");
        }
        Ok(created)
    }

    pub async fn update(&self, svc: Service) -> Result<Service> {
        self.inner.update(svc).await
    }

    pub async fn delete(&self, id: &str) -> Result<Service> {
        self.inner.delete(id).await
    }

    pub async fn watch(
        &self,
        params: &WatchParams,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<WatchEvent<Service>>> + Send>>> {
        self.inner.watch(params).await
    }
}
