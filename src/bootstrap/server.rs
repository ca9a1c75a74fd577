use std::sync::Arc;
use std::time::Duration;

use crate::adapters::inbound::http::{router, AppState};
use crate::adapters::outbound::deploy::ContainerProvisioner;
use crate::adapters::outbound::persistence::SqliteStore;
use crate::adapters::outbound::rpc::StubRpcClient;
use crate::application::{MasterMonitor, SyncEngine};

use super::config::AppConfig;

/// Wires config + logging + persistence + the Sync Engine + the HTTP router, then starts the
/// poll loop, the heartbeat task, and the axum server — the teacher's `main.rs` assembly,
/// generalized from its ZMQ relay wiring to this engine's components.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let database_url = format!("sqlite://{}?mode=rwc", config.database.path);
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let store = Arc::new(SqliteStore::new(&database_url).await?);

    let master_client = Arc::new(StubRpcClient::new(config.master.host.clone(), config.master.port));
    let monitor = MasterMonitor::new(config.master.clone(), master_client);

    let engine = Arc::new(SyncEngine::new(monitor, store, config.settings.clone()));

    for slave in &config.slaves {
        let client = Arc::new(StubRpcClient::new(slave.host.clone(), slave.port));
        if let Err(e) = engine.add_slave(slave.clone(), client).await {
            tracing::error!(slave = %slave.name, error = %e, "failed to register slave from config");
        }
    }

    engine.start(Duration::from_secs(5)).await?;

    tokio::spawn(engine.clone().run_poll_loop());
    tokio::spawn(engine.clone().run_heartbeat());

    let provisioner = Arc::new(ContainerProvisioner::new("mt5-copier-net", "mt5-slave-image:latest"));
    let app = router(AppState { engine: engine.clone(), provisioner });

    let addr = format!("{}:{}", config.api.host, config.api.port);
    tracing::info!(%addr, "starting control plane");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    engine.stop().await;
    Ok(())
}
