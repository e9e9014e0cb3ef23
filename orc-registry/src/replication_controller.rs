use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use orc_core::types::ReplicationController;
use orc_core::{Error, ListParams, Resource, Result, WatchEvent, WatchParams};
use orc_store::Store;

use crate::generic::GenericRegistry;

/// Per-kind CRUD for `ReplicationController`, adding the one kind-specific rule: deletion
/// refuses unless the declared replica count has already been brought to zero
/// (stop-before-delete).
#[derive(Clone)]
pub struct ReplicationControllerRegistry {
    inner: GenericRegistry<ReplicationController>,
}

impl ReplicationControllerRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: GenericRegistry::new(store),
        }
    }

    pub async fn get(&self, id: &str) -> Result<ReplicationController> {
        self.inner.get(id).await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<ReplicationController>> {
        self.inner.list(params).await
    }

    pub async fn create(&self, rc: ReplicationController) -> Result<ReplicationController> {
        self.inner.create(rc).await
    }

    pub async fn update(&self, rc: ReplicationController) -> Result<ReplicationController> {
        self.inner.update(rc).await
    }

    pub async fn delete(&self, id: &str) -> Result<ReplicationController> {
        let current = self.inner.get(id).await?;
        if current.spec.replicas != 0 {
            return Err(Error::Conflict {
                kind: ReplicationController::KIND,
                id: id.to_string(),
                reason: "replicas must be scaled to 0 before delete".to_string(),
            });
        }
        self.inner.delete(id).await
    }

    pub async fn watch(
        &self,
        params: &WatchParams,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<WatchEvent<ReplicationController>>> + Send>>> {
        self.inner.watch(params).await
    }
}
