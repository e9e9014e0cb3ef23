//! Maintains, for every service, the sorted set of `(host, port)` tuples of pods matching
//! its selector.
use std::collections::BTreeMap;
use std::time::Duration;

use futures::StreamExt;
use orc_core::types::{Endpoints, EndpointsSubset, Pod, Service};
use orc_core::{Error, ListParams, ResourceExt, WatchParams};
use orc_registry::Registries;
use tracing::{debug, instrument, warn};

use crate::watch::WatchMultiplexer;

pub struct EndpointsController {
    registries: Registries,
    resync: Duration,
}

impl EndpointsController {
    pub fn new(registries: Registries, resync: Duration) -> Self {
        Self { registries, resync }
    }

    pub async fn run(self, services: WatchMultiplexer<Service>, pods: WatchMultiplexer<Pod>) -> orc_core::Result<()> {
        let mut svc_stream = services.subscribe(&WatchParams::default()).await?;
        let mut pod_stream = pods.subscribe(&WatchParams::default()).await?;
        let mut resync = tokio::time::interval(self.resync);
        resync.tick().await;
        self.reconcile_all().await;

        loop {
            tokio::select! {
                event = svc_stream.next() => {
                    match event {
                        Some(_) => self.reconcile_all().await,
                        None => break,
                    }
                }
                event = pod_stream.next() => {
                    match event {
                        Some(_) => self.reconcile_all().await,
                        None => break,
                    }
                }
                _ = resync.tick() => self.reconcile_all().await,
            }
        }
        Ok(())
    }

    async fn reconcile_all(&self) {
        let Ok(services) = self.registries.services.list(&ListParams::default()).await else {
            return;
        };
        for service in &services {
            self.reconcile_one(service).await;
        }
    }

    #[instrument(level = "debug", skip(self, service), fields(service_id = service.id()))]
    async fn reconcile_one(&self, service: &Service) {
        let Ok(pods) = self.registries.pods.list(&ListParams::default()).await else {
            return;
        };

        let mut subsets: Vec<EndpointsSubset> = pods
            .iter()
            .filter(|pod| !pod.status.host.is_empty() && selector_matches(&service.spec.selector, &pod.metadata.labels))
            .flat_map(|pod| {
                pod.spec
                    .containers
                    .iter()
                    .flat_map(|c| c.ports.iter())
                    .filter(|port| port.container_port == service.spec.port)
                    .map(|port| EndpointsSubset {
                        host: pod.status.host.clone(),
                        port: port.host_port,
                    })
            })
            .collect();
        subsets.sort();
        subsets.dedup();

        let current = match self.registries.endpoints.get(service.id()).await {
            Ok(current) => current,
            Err(_) => return, // no Endpoints object yet; the service's own Create cascades one
        };
        if current.subsets == subsets {
            return;
        }

        let updated = Endpoints {
            subsets,
            ..current
        };
        match self.registries.endpoints.update(updated).await {
            Ok(_) => {}
            Err(Error::Conflict { .. }) => {
                debug!(service_id = service.id(), "endpoints write dropped on conflict; next event reconverges");
            }
            Err(err) => warn!(service_id = service.id(), %err, "failed to update endpoints"),
        }
    }
}

fn selector_matches(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_core::types::{Container, ContainerPort, PodSpec, PodStatus, Protocol, ServiceSpec};
    use orc_core::ObjectMeta;
    use orc_registry::Registries;
    use orc_store::MemStore;
    use std::sync::Arc;

    fn registries() -> Registries {
        Registries::new(Arc::new(MemStore::new()))
    }

    fn labeled_pod(id: &str, host: &str, container_port: u16) -> Pod {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "foo".to_string());
        Pod {
            metadata: ObjectMeta {
                labels,
                ..ObjectMeta::new(id)
            },
            spec: PodSpec {
                containers: vec![Container {
                    name: "c".into(),
                    image: "nginx:1".into(),
                    ports: vec![ContainerPort {
                        host_port: 8080,
                        container_port,
                        protocol: Protocol::Tcp,
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            },
            status: PodStatus {
                host: host.to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn fills_endpoints_for_matching_bound_pods() {
        let regs = registries();
        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "foo".to_string());
        let svc = Service {
            metadata: ObjectMeta::new("svc1"),
            spec: ServiceSpec { port: 80, selector },
        };
        regs.services.create(svc.clone()).await.unwrap();
        regs.pods.create(labeled_pod("p1", "10.0.0.5", 80)).await.unwrap();

        let controller = EndpointsController::new(regs.clone(), Duration::from_secs(10));
        controller.reconcile_one(&svc).await;

        let endpoints = regs.endpoints.get("svc1").await.unwrap();
        assert_eq!(endpoints.subsets, vec![EndpointsSubset { host: "10.0.0.5".into(), port: 8080 }]);
    }

    #[tokio::test]
    async fn unassigned_pods_are_excluded() {
        let regs = registries();
        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "foo".to_string());
        let svc = Service {
            metadata: ObjectMeta::new("svc1"),
            spec: ServiceSpec { port: 80, selector },
        };
        regs.services.create(svc.clone()).await.unwrap();
        regs.pods.create(labeled_pod("p1", "", 80)).await.unwrap();

        let controller = EndpointsController::new(regs.clone(), Duration::from_secs(10));
        controller.reconcile_one(&svc).await;

        let endpoints = regs.endpoints.get("svc1").await.unwrap();
        assert!(endpoints.subsets.is_empty());
    }
}
