//! Per-resource-kind CRUD over the persistence adapter: pods, replication
//! controllers, services, endpoints, minions. Enforces per-kind invariants (name
//! uniqueness via the store's own CAS, optimistic concurrency, and the few
//! cross-object rules — RC's stop-before-delete, Service's cascading
//! Endpoints, Endpoints' controller-wins CAS) on top of one shared generic CRUD
//! implementation.
mod endpoints;
mod error;
mod generic;
mod minion;
mod pod;
mod replication_controller;
mod service;

pub use endpoints::EndpointsRegistry;
pub use minion::MinionRegistry;
pub use pod::PodRegistry;
pub use replication_controller::ReplicationControllerRegistry;
pub use service::ServiceRegistry;

use std::sync::Arc;

use orc_store::Store;

/// Every per-kind registry, constructed once over a shared store and handed to the REST
/// surface and the control loops alike.
#[derive(Clone)]
pub struct Registries {
    pub pods: PodRegistry,
    pub replication_controllers: ReplicationControllerRegistry,
    pub services: ServiceRegistry,
    pub endpoints: EndpointsRegistry,
    pub minions: MinionRegistry,
}

impl Registries {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            pods: PodRegistry::new(store.clone()),
            replication_controllers: ReplicationControllerRegistry::new(store.clone()),
            services: ServiceRegistry::new(store.clone()),
            endpoints: EndpointsRegistry::new(store.clone()),
            minions: MinionRegistry::new(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_core::types::{Pod, PodSpec, ReplicationController, ReplicationControllerSpec};
    use orc_core::{Error, ListParams, ObjectMeta};
    use orc_store::MemStore;

    fn registries() -> Registries {
        Registries::new(Arc::new(MemStore::new()))
    }

    fn pod(id: &str) -> Pod {
        Pod {
            metadata: ObjectMeta::new(id),
            spec: PodSpec::default(),
            status: Default::default(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let regs = registries();
        let created = regs.pods.create(pod("p1")).await.unwrap();
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        let fetched = regs.pods.get("p1").await.unwrap();
        assert_eq!(fetched.metadata.id, "p1");
    }

    #[tokio::test]
    async fn create_twice_is_already_exists() {
        let regs = registries();
        regs.pods.create(pod("p1")).await.unwrap();
        let err = regs.pods.create(pod("p1")).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let regs = registries();
        let created = regs.pods.create(pod("p1")).await.unwrap();
        regs.pods.update(created.clone()).await.unwrap();
        let err = regs.pods.update(created).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let regs = registries();
        let err = regs.pods.update(pod("ghost")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_filters_by_label_selector() {
        let regs = registries();
        let mut a = pod("a");
        a.metadata.labels.insert("tier".into(), "backend".into());
        let mut b = pod("b");
        b.metadata.labels.insert("tier".into(), "frontend".into());
        regs.pods.create(a).await.unwrap();
        regs.pods.create(b).await.unwrap();

        let params = ListParams::default().labels("tier=backend").unwrap();
        let found = regs.pods.list(&params).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.id, "a");
    }

    #[tokio::test]
    async fn rc_delete_refuses_nonzero_replicas() {
        let regs = registries();
        let rc = ReplicationController {
            metadata: ObjectMeta::new("rc1"),
            spec: ReplicationControllerSpec {
                replicas: 2,
                ..Default::default()
            },
            status: Default::default(),
        };
        regs.replication_controllers.create(rc).await.unwrap();
        let err = regs.replication_controllers.delete("rc1").await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn service_create_also_creates_empty_endpoints() {
        let regs = registries();
        let svc = orc_core::types::Service {
            metadata: ObjectMeta::new("svc1"),
            spec: Default::default(),
        };
        regs.services.create(svc).await.unwrap();
        let endpoints = regs.endpoints.get("svc1").await.unwrap();
        assert!(endpoints.subsets.is_empty());
    }
}
