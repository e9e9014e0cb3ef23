//! Binds unassigned pods to a minion using first-fit over declared host-port conflicts.
//! Stateless beyond the watch itself: every decision is made from a fresh read of
//! the current pod and minion lists.
use std::collections::BTreeSet;
use std::time::Duration;

use futures::StreamExt;
use orc_core::types::{Pod, Protocol};
use orc_core::{ListParams, ResourceExt, WatchParams};
use orc_registry::Registries;
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::watch::WatchMultiplexer;

pub struct Scheduler {
    registries: Registries,
    resync: Duration,
}

impl Scheduler {
    pub fn new(registries: Registries, resync: Duration) -> Self {
        Self { registries, resync }
    }

    /// Runs until the pod watch ends (normally only at process shutdown). A periodic
    /// resync re-examines every still-unassigned pod in case a watch event was missed,
    /// retrying on a default-10s resync as a fallback.
    pub async fn run(self, pods: WatchMultiplexer<Pod>) -> orc_core::Result<()> {
        let mut stream = pods.subscribe(&WatchParams::default()).await?;
        let mut resync = tokio::time::interval(self.resync);
        resync.tick().await; // first tick fires immediately; the initial watch replay covers it

        loop {
            tokio::select! {
                event = stream.next() => {
                    match event {
                        Some(Ok(event)) => {
                            if let Some(pod) = event.object() {
                                if pod.status.is_unassigned() {
                                    self.try_schedule(pod.clone()).await;
                                }
                            }
                        }
                        Some(Err(err)) => warn!(%err, "pod watch error in scheduler"),
                        None => break,
                    }
                }
                _ = resync.tick() => self.resync_unassigned().await,
            }
        }
        Ok(())
    }

    async fn resync_unassigned(&self) {
        let Ok(pods) = self.registries.pods.list(&ListParams::default()).await else {
            return;
        };
        for pod in pods {
            if pod.status.is_unassigned() {
                self.try_schedule(pod).await;
            }
        }
    }

    #[instrument(level = "debug", skip(self, pod), fields(pod_id = pod.id()))]
    async fn try_schedule(&self, mut pod: Pod) {
        let (Ok(minions), Ok(all_pods)) = (
            self.registries.minions.list(&ListParams::default()).await,
            self.registries.pods.list(&ListParams::default()).await,
        ) else {
            return;
        };

        let candidate_ports: BTreeSet<(u16, Protocol)> = pod
            .spec
            .containers
            .iter()
            .flat_map(|c| c.ports.iter().map(|p| (p.host_port, p.protocol)))
            .collect();

        let eligible: Vec<_> = minions
            .iter()
            .filter(|minion| {
                let consumed: BTreeSet<(u16, Protocol)> = all_pods
                    .iter()
                    .filter(|p| p.status.host == minion.address && p.id() != pod.id())
                    .flat_map(|p| p.spec.containers.iter())
                    .flat_map(|c| c.ports.iter().map(|p| (p.host_port, p.protocol)))
                    .collect();
                candidate_ports.is_disjoint(&consumed)
            })
            .collect();

        let Some(chosen) = pick_uniformly(&eligible) else {
            warn!(pod_id = pod.id(), "FailedScheduling: no minion without a conflicting host port");
            return;
        };

        let pod_id = pod.id().to_string();
        pod.status.host = chosen.address.clone();
        match self.registries.pods.update(pod).await {
            Ok(bound) => info!(%pod_id, host = %bound.status.host, "pod scheduled"),
            Err(orc_core::Error::Conflict { .. }) => {
                // Someone else moved the pod meanwhile (a re-bind, or another scheduler
                // pass); the next watch event for this pod will retry it.
            }
            Err(err) => warn!(%pod_id, %err, "failed to bind pod"),
        }
    }
}

fn pick_uniformly<'a, T>(items: &'a [&'a T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..items.len());
    Some(items[idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_core::types::{Container, ContainerPort, Minion, PodSpec};
    use orc_core::ObjectMeta;
    use orc_store::MemStore;
    use std::sync::Arc;

    fn pod_with_port(id: &str, host_port: u16) -> Pod {
        Pod {
            metadata: ObjectMeta::new(id),
            spec: PodSpec {
                containers: vec![Container {
                    name: "c".into(),
                    image: "nginx:1".into(),
                    ports: vec![ContainerPort {
                        host_port,
                        container_port: host_port,
                        protocol: Protocol::Tcp,
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            },
            status: Default::default(),
        }
    }

    #[tokio::test]
    async fn schedules_to_a_minion_without_port_conflict() {
        let registries = Registries::new(Arc::new(MemStore::new()));
        registries
            .minions
            .create(Minion {
                metadata: ObjectMeta::new("m1"),
                address: "10.0.0.1".into(),
            })
            .await
            .unwrap();
        let scheduler = Scheduler::new(registries.clone(), Duration::from_secs(10));
        let created = registries.pods.create(pod_with_port("p1", 80)).await.unwrap();
        scheduler.try_schedule(created).await;
        let bound = registries.pods.get("p1").await.unwrap();
        assert_eq!(bound.status.host, "10.0.0.1");
    }

    #[tokio::test]
    async fn second_conflicting_pod_lands_on_a_different_minion() {
        let registries = Registries::new(Arc::new(MemStore::new()));
        for (id, addr) in [("m1", "10.0.0.1"), ("m2", "10.0.0.2")] {
            registries
                .minions
                .create(Minion {
                    metadata: ObjectMeta::new(id),
                    address: addr.into(),
                })
                .await
                .unwrap();
        }
        let scheduler = Scheduler::new(registries.clone(), Duration::from_secs(10));
        let a = registries.pods.create(pod_with_port("a", 80)).await.unwrap();
        scheduler.try_schedule(a).await;
        let b = registries.pods.create(pod_with_port("b", 80)).await.unwrap();
        scheduler.try_schedule(b).await;

        let bound_a = registries.pods.get("a").await.unwrap();
        let bound_b = registries.pods.get("b").await.unwrap();
        assert_ne!(bound_a.status.host, bound_b.status.host);
    }

    #[tokio::test]
    async fn failed_scheduling_leaves_pod_unassigned() {
        let registries = Registries::new(Arc::new(MemStore::new()));
        let scheduler = Scheduler::new(registries.clone(), Duration::from_secs(10));
        let created = registries.pods.create(pod_with_port("p1", 80)).await.unwrap();
        scheduler.try_schedule(created).await;
        let pod = registries.pods.get("p1").await.unwrap();
        assert!(pod.status.is_unassigned());
    }
}
