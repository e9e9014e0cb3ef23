//! Shared application state: the registries plus one watch multiplexer per kind,
//! constructed once at startup (`orc-server`) and cloned into every request handler.
use std::sync::Arc;

use orc_core::types::{Endpoints, Minion, Pod, ReplicationController, Service};
use orc_registry::Registries;
use orc_runtime::WatchMultiplexer;
use orc_store::Store;

/// One shared multiplexer per kind — the REST watch handlers subscribe to these
/// rather than opening a store-level watch per client.
#[derive(Clone)]
pub struct Watches {
    pub pods: WatchMultiplexer<Pod>,
    pub replication_controllers: WatchMultiplexer<ReplicationController>,
    pub services: WatchMultiplexer<Service>,
    pub endpoints: WatchMultiplexer<Endpoints>,
    pub minions: WatchMultiplexer<Minion>,
}

impl Watches {
    pub fn spawn(store: Arc<dyn Store>) -> Self {
        Self {
            pods: WatchMultiplexer::spawn(store.clone()),
            replication_controllers: WatchMultiplexer::spawn(store.clone()),
            services: WatchMultiplexer::spawn(store.clone()),
            endpoints: WatchMultiplexer::spawn(store.clone()),
            minions: WatchMultiplexer::spawn(store),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub registries: Registries,
    pub watches: Watches,
}

impl ApiState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            registries: Registries::new(store.clone()),
            watches: Watches::spawn(store),
        }
    }
}
