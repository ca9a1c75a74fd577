use mt5_copier::bootstrap::{config, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load()?;
    let _logging_guard = logging::init(&config.logging);

    tracing::info!(
        master = %config.master.host,
        slaves = config.slaves.len(),
        "mt5-copier starting"
    );

    server::run(config).await
}
