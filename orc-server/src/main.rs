//! Process wiring: resolves configuration, seeds the static minion list, and
//! spawns the REST surface plus the three control loops as independent tasks sharing one
//! in-process store.
mod config;

use std::sync::Arc;

use orc_core::types::Minion;
use orc_core::ObjectMeta;
use orc_runtime::{EndpointsController, ReplicationControllerManager, Scheduler};
use orc_store::MemStore;
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::resolve()?;
    init_tracing(&config.log_filter);

    let store: Arc<dyn orc_store::Store> = Arc::new(MemStore::new());
    let state = orc_api::ApiState::new(store.clone());

    for minion in &config.minions {
        let minion = Minion {
            metadata: ObjectMeta::new(minion.id.clone()),
            address: minion.address.clone(),
        };
        match state.registries.minions.create(minion).await {
            Ok(_) => {}
            Err(orc_core::Error::AlreadyExists { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    tracing::info!(count = config.minions.len(), "seeded static minion list");

    let scheduler = Scheduler::new(state.registries.clone(), config.resync);
    let scheduler_pods = state.watches.pods.clone();
    let scheduler_task = tokio::spawn(async move {
        if let Err(err) = scheduler.run(scheduler_pods).await {
            tracing::error!(%err, "scheduler loop exited");
        }
    });

    let replication = ReplicationControllerManager::new(state.registries.clone(), config.resync);
    let replication_controllers = state.watches.replication_controllers.clone();
    let replication_pods = state.watches.pods.clone();
    let replication_task = tokio::spawn(async move {
        if let Err(err) = replication.run(replication_controllers, replication_pods).await {
            tracing::error!(%err, "replication controller manager exited");
        }
    });

    let endpoints = EndpointsController::new(state.registries.clone(), config.resync);
    let endpoints_services = state.watches.services.clone();
    let endpoints_pods = state.watches.pods.clone();
    let endpoints_task = tokio::spawn(async move {
        if let Err(err) = endpoints.run(endpoints_services, endpoints_pods).await {
            tracing::error!(%err, "endpoints controller exited");
        }
    });

    let bind_addr = config.bind_addr;
    let app = orc_api::router(state, config.request_timeout);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "orc-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler_task.abort();
    replication_task.abort();
    endpoints_task.abort();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("ORC_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
