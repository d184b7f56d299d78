use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::store::WalStore;

/// How often the compactor checks the WAL size.
const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Current wall-clock time in UTC, the zone every reservation time is kept in.
pub fn utc_now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Background task that periodically moves elapsed bookings to COMPLETED.
/// `now` supplies the current time in the reservations' zone.
pub async fn run_completion_sweeper<C>(engine: Arc<Engine>, every: Duration, now: C)
where
    C: Fn() -> NaiveDateTime + Send + 'static,
{
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match engine.complete_elapsed(now()).await {
            Ok(done) if done.is_empty() => debug!("completion sweep: nothing elapsed"),
            Ok(_) => {}
            // Transient store fault; the next tick retries.
            Err(e) => warn!("completion sweep failed: {e}"),
        }
    }
}

/// Background task that compacts the WAL once enough appends have piled up.
pub async fn run_compactor(store: Arc<WalStore>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        let appends = store.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match store.compact().await {
            Ok(()) => info!("compacted WAL after {appends} appends"),
            Err(e) => warn!("WAL compaction failed: {e}"),
        }
    }
}
