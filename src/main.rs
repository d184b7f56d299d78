use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use courtbook::auth::RoleDirectory;
use courtbook::catalog::InMemoryCourts;
use courtbook::config::Config;
use courtbook::engine::Engine;
use courtbook::notify::NotifyHub;
use courtbook::store::WalStore;
use courtbook::sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    courtbook::observability::init(config.metrics_port)?;
    let slots = config.slot_catalog()?;
    let slot_count = slots.slot_count();

    std::fs::create_dir_all(&config.data_dir)?;
    let wal_path = config.wal_path();
    let store = Arc::new(WalStore::open(&wal_path, Arc::new(NotifyHub::new()))?);

    let engine = Arc::new(Engine::new(
        Arc::new(InMemoryCourts::new()),
        store.clone(),
        Arc::new(RoleDirectory::new()),
        slots,
    ));

    info!("courtbook started");
    info!("  wal: {}", wal_path.display());
    info!(
        "  operating window: {}:00-{}:00 UTC, {} slots of {} min",
        config.open_hour,
        config.close_hour,
        slot_count,
        config.slot_minutes
    );
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let sweep = tokio::spawn(sweeper::run_completion_sweeper(
        engine,
        Duration::from_secs(config.sweep_secs.max(1)),
        sweeper::utc_now,
    ));
    let compact = tokio::spawn(sweeper::run_compactor(store.clone(), config.compact_threshold));

    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    sweep.abort();
    compact.abort();
    if let Err(e) = store.compact().await {
        tracing::warn!("final compaction failed: {e}");
    }
    info!("courtbook stopped");
    Ok(())
}
