//! Drives each replication controller's observed pod count toward its declared one.
//!
//! Reconciliation is serialized per controller id; events that arrive while a pass is
//! already running for that id coalesce into a single follow-up pass rather than queuing
//! one task per event — a work queue per entity id keyed by id with set semantics,
//! implemented here as a per-id debounce rather than a literal queue type.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use orc_core::types::{Pod, PodStatus, ReplicationController};
use orc_core::{ListParams, ResourceExt};
use orc_core::{Selector, WatchParams};
use orc_registry::Registries;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{instrument, warn};

use crate::watch::WatchMultiplexer;

struct PerControllerState {
    lock: AsyncMutex<()>,
    queued: AtomicBool,
}

pub struct ReplicationControllerManager {
    registries: Registries,
    resync: Duration,
    states: Mutex<HashMap<String, Arc<PerControllerState>>>,
}

impl ReplicationControllerManager {
    pub fn new(registries: Registries, resync: Duration) -> Arc<Self> {
        Arc::new(Self {
            registries,
            resync,
            states: Mutex::new(HashMap::new()),
        })
    }

    /// Runs until either watch ends. Any replication controller event marks that
    /// controller's id; any pod event conservatively marks every controller (a precise
    /// selector match against the event's own labels would save work, but correctness
    /// doesn't depend on it — a spurious reconcile pass is a no-op CAS-free read).
    pub async fn run(
        self: Arc<Self>,
        controllers: WatchMultiplexer<ReplicationController>,
        pods: WatchMultiplexer<Pod>,
    ) -> orc_core::Result<()> {
        let mut rc_stream = controllers.subscribe(&WatchParams::default()).await?;
        let mut pod_stream = pods.subscribe(&WatchParams::default()).await?;
        let mut resync = tokio::time::interval(self.resync);
        resync.tick().await;
        self.mark_all().await;

        loop {
            tokio::select! {
                event = rc_stream.next() => {
                    match event {
                        Some(Ok(event)) => {
                            if let Some(rc) = event.object() {
                                self.mark(rc.id().to_string());
                            }
                        }
                        Some(Err(err)) => warn!(%err, "replication controller watch error"),
                        None => break,
                    }
                }
                event = pod_stream.next() => {
                    match event {
                        Some(_) => self.mark_all().await,
                        None => break,
                    }
                }
                _ = resync.tick() => self.mark_all().await,
            }
        }
        Ok(())
    }

    async fn mark_all(&self) {
        if let Ok(controllers) = self.registries.replication_controllers.list(&ListParams::default()).await {
            for rc in controllers {
                self.mark(rc.metadata.id.clone());
            }
        }
    }

    fn mark(self: &Arc<Self>, id: String) {
        let state = {
            let mut states = self.states.lock();
            states
                .entry(id.clone())
                .or_insert_with(|| {
                    Arc::new(PerControllerState {
                        lock: AsyncMutex::new(()),
                        queued: AtomicBool::new(false),
                    })
                })
                .clone()
        };
        if state.queued.swap(true, Ordering::SeqCst) {
            return; // a pass is already queued (or running and about to re-check); it'll pick this up
        }
        let this = self.clone();
        tokio::spawn(async move {
            let _guard = state.lock.lock().await;
            state.queued.store(false, Ordering::SeqCst);
            this.reconcile_one(&id).await;
        });
    }

    #[instrument(level = "debug", skip(self), fields(controller_id = %id))]
    async fn reconcile_one(&self, id: &str) {
        let rc = match self.registries.replication_controllers.get(id).await {
            Ok(rc) => rc,
            Err(_) => return, // deleted since being marked; nothing to reconcile
        };

        let selector: Selector = rc.spec.selector.clone().into_iter().collect();
        let params = ListParams {
            label_selector: selector,
            field_selector: None,
        };
        let Ok(matching) = self.registries.pods.list(&params).await else {
            return;
        };
        let observed: Vec<Pod> = matching.into_iter().filter(|p| !p.status.is_terminating()).collect();
        let desired = rc.spec.replicas as usize;

        if observed.len() < desired {
            let missing = desired - observed.len();
            let creates = (0..missing).map(|_| self.spawn_from_template(&rc));
            futures::future::join_all(creates).await;
        } else if observed.len() > desired {
            let excess = observed.len() - desired;
            let mut victims = observed;
            victims.sort_by(|a, b| match (a.status.is_unassigned(), b.status.is_unassigned()) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.metadata.creation_timestamp.cmp(&b.metadata.creation_timestamp),
            });
            let deletes = victims.into_iter().take(excess).map(|p| {
                let registries = self.registries.clone();
                async move {
                    if let Err(err) = registries.pods.delete(p.id()).await {
                        warn!(pod_id = p.id(), %err, "failed to delete excess pod; retried on next pass");
                    }
                }
            });
            futures::future::join_all(deletes).await;
        }
    }

    async fn spawn_from_template(&self, rc: &ReplicationController) {
        let mut labels = rc.spec.template.labels.clone();
        for (k, v) in &rc.spec.selector {
            labels.insert(k.clone(), v.clone());
        }
        let pod = Pod {
            metadata: orc_core::ObjectMeta {
                id: format!("{}-{:08x}", rc.id(), rand::random::<u32>()),
                labels,
                ..Default::default()
            },
            spec: rc.spec.template.spec.clone(),
            status: PodStatus::default(),
        };
        if let Err(err) = self.registries.pods.create(pod).await {
            warn!(controller_id = rc.id(), %err, "failed to create replica pod; retried on next pass");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_core::types::{PodTemplateSpec, ReplicationControllerSpec};
    use orc_core::ObjectMeta;
    use orc_store::MemStore;
    use std::collections::BTreeMap;

    fn rc(id: &str, replicas: u32) -> ReplicationController {
        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "foo".to_string());
        ReplicationController {
            metadata: ObjectMeta::new(id),
            spec: ReplicationControllerSpec {
                replicas,
                selector: selector.clone(),
                template: PodTemplateSpec {
                    labels: selector,
                    spec: Default::default(),
                },
            },
            status: Default::default(),
        }
    }

    #[tokio::test]
    async fn scale_up_creates_missing_pods() {
        let registries = Registries::new(Arc::new(MemStore::new()));
        let controller = registries.replication_controllers.create(rc("rc1", 3)).await.unwrap();
        let manager = ReplicationControllerManager::new(registries.clone(), Duration::from_secs(10));
        manager.reconcile_one(&controller.metadata.id).await;

        let pods = registries
            .pods
            .list(&ListParams::default().labels("app=foo").unwrap())
            .await
            .unwrap();
        assert_eq!(pods.len(), 3);
    }

    #[tokio::test]
    async fn scale_down_prefers_unassigned_pods() {
        let registries = Registries::new(Arc::new(MemStore::new()));
        let controller = registries.replication_controllers.create(rc("rc1", 2)).await.unwrap();
        let manager = ReplicationControllerManager::new(registries.clone(), Duration::from_secs(10));
        manager.reconcile_one(&controller.metadata.id).await;

        let scaled_down = ReplicationController {
            spec: ReplicationControllerSpec {
                replicas: 0,
                ..controller.spec.clone()
            },
            ..controller
        };
        registries.replication_controllers.update(scaled_down).await.unwrap();
        manager.reconcile_one("rc1").await;

        let pods = registries
            .pods
            .list(&ListParams::default().labels("app=foo").unwrap())
            .await
            .unwrap();
        assert!(pods.is_empty());
    }
}
