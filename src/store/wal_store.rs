use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::limits::{MAX_RESERVATIONS_PER_COURT, WAL_CHANNEL_CAPACITY};
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability::{WAL_FLUSH_BATCH_SIZE, WAL_FLUSH_DURATION_SECONDS};
use crate::wal::Wal;

use super::{ReservationStore, StoreError};

pub type SharedLedger = Arc<RwLock<CourtLedger>>;

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Background task that owns the WAL and batches appends for group commit:
/// take the first append, drain whatever else is already queued, then
/// fsync once for the whole batch and answer every sender.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };
        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    // Commit what we have before a compaction can swap the file.
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }
        commit_batch(&mut wal, &mut batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<PendingAppend>) {
    metrics::histogram!(WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();

    let mut append_err = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after an append error so partial bytes don't leak into the next batch.
    let flush_err = wal.flush_sync().err();
    let result = match append_err.or(flush_err) {
        Some(e) => Err(e),
        None => Ok(()),
    };
    metrics::histogram!(WAL_FLUSH_DURATION_SECONDS).record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// Apply an event to a ledger (no locking, caller holds the lock).
fn apply_to_ledger(ledger: &mut CourtLedger, event: &Event, index: &DashMap<Ulid, Ulid>) {
    match event {
        Event::ReservationCreated { reservation } => {
            index.insert(reservation.id, reservation.court_id);
            ledger.insert(reservation.clone());
        }
        Event::StatusChanged { id, status, .. } => {
            if let Some(r) = ledger.get_mut(id) {
                r.status = *status;
            }
        }
    }
}

/// Reservation store backed by per-court in-memory ledgers and a
/// write-ahead log.
///
/// Each court's ledger sits behind its own `RwLock`. `insert` re-runs the
/// overlap check under the court's write lock, which makes the store the
/// exclusion constraint for concurrent bookings of the same court.
/// `update_status` checks the stored status under the same lock.
pub struct WalStore {
    ledgers: DashMap<Ulid, SharedLedger>,
    /// Held shared by every mutation and exclusively by `compact`, so no
    /// append (including one that creates a ledger) can straddle the swap.
    compaction: RwLock<()>,
    /// Reverse lookup: reservation id → court id.
    reservation_to_court: DashMap<Ulid, Ulid>,
    wal_tx: mpsc::Sender<WalCommand>,
    notify: Arc<NotifyHub>,
}

impl WalStore {
    /// Replay the log at `path` and start the group-commit writer.
    /// Must be called from within a tokio runtime.
    pub fn open(path: &Path, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::replay(path)?;
        let wal = Wal::open(path)?;
        let (wal_tx, wal_rx) = mpsc::channel(WAL_CHANNEL_CAPACITY);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let store = Self {
            ledgers: DashMap::new(),
            compaction: RwLock::new(()),
            reservation_to_court: DashMap::new(),
            wal_tx,
            notify,
        };

        // Sole owner of these Arcs during replay, so try_write never contends.
        for event in &events {
            let ledger = store.ledger(event.court_id());
            let mut guard = ledger
                .try_write()
                .map_err(|_| io::Error::other("replay: ledger contended"))?;
            apply_to_ledger(&mut guard, event, &store.reservation_to_court);
        }
        tracing::debug!("replayed {} events from {}", events.len(), path.display());

        Ok(store)
    }

    fn ledger(&self, court_id: Ulid) -> SharedLedger {
        self.ledgers
            .entry(court_id)
            .or_insert_with(|| Arc::new(RwLock::new(CourtLedger::new(court_id))))
            .clone()
    }

    fn existing_ledger(&self, court_id: &Ulid) -> Option<SharedLedger> {
        self.ledgers.get(court_id).map(|e| e.value().clone())
    }

    fn all_ledgers(&self) -> Vec<SharedLedger> {
        self.ledgers.iter().map(|e| e.value().clone()).collect()
    }

    pub fn notify(&self) -> &Arc<NotifyHub> {
        &self.notify
    }

    async fn wal_append(&self, event: &Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::Unavailable("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Unavailable("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Unavailable(format!("WAL error: {e}")))
    }

    /// WAL-append, apply, notify.
    async fn persist_and_apply(&self, ledger: &mut CourtLedger, event: &Event) -> Result<(), StoreError> {
        self.wal_append(event).await?;
        apply_to_ledger(ledger, event, &self.reservation_to_court);
        self.notify.send(event);
        Ok(())
    }

    /// Rewrite the log with one record per reservation, carrying its current status.
    /// Mutations wait until the swap completes.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let _exclusive = self.compaction.write().await;
        let mut events = Vec::new();
        for ledger in self.all_ledgers() {
            let guard = ledger.read().await;
            events.extend(guard.reservations.iter().map(|r| Event::ReservationCreated {
                reservation: r.clone(),
            }));
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::Unavailable("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Unavailable("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Unavailable(format!("WAL compaction: {e}")))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    async fn collect(&self, keep: impl Fn(&Reservation) -> bool) -> Vec<Reservation> {
        let mut out = Vec::new();
        for ledger in self.all_ledgers() {
            let guard = ledger.read().await;
            out.extend(guard.reservations.iter().filter(|r| keep(r)).cloned());
        }
        out
    }
}

#[async_trait]
impl ReservationStore for WalStore {
    async fn find_active_reservations(
        &self,
        court_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let Some(ledger) = self.existing_ledger(&court_id) else {
            return Ok(Vec::new());
        };
        let guard = ledger.read().await;
        Ok(guard.active_on(date).cloned().collect())
    }

    async fn get(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        let Some(court_id) = self.reservation_to_court.get(&id).map(|e| *e.value()) else {
            return Ok(None);
        };
        let Some(ledger) = self.existing_ledger(&court_id) else {
            return Ok(None);
        };
        let guard = ledger.read().await;
        Ok(guard.get(&id).cloned())
    }

    async fn insert(&self, reservation: Reservation) -> Result<(), StoreError> {
        let _shared = self.compaction.read().await;
        let ledger = self.ledger(reservation.court_id);
        let mut guard = ledger.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_COURT {
            return Err(StoreError::Unavailable("too many reservations on court".into()));
        }
        if reservation.is_active()
            && let Some(existing) = guard.overlapping_active(&reservation.span()).next()
        {
            return Err(StoreError::Conflict(existing.id));
        }

        let event = Event::ReservationCreated { reservation };
        self.persist_and_apply(&mut guard, &event).await
    }

    async fn update_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
    ) -> Result<Reservation, StoreError> {
        let court_id = self
            .reservation_to_court
            .get(&id)
            .map(|e| *e.value())
            .ok_or(StoreError::NotFound(id))?;
        let _shared = self.compaction.read().await;
        let ledger = self.existing_ledger(&court_id).ok_or(StoreError::NotFound(id))?;
        let mut guard = ledger.write().await;
        let current = guard.get(&id).ok_or(StoreError::NotFound(id))?;
        if current.status == status {
            return Ok(current.clone());
        }
        if current.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let event = Event::StatusChanged { id, court_id, status };
        self.persist_and_apply(&mut guard, &event).await?;
        guard.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn list_by_requester(&self, requester_id: Ulid) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.collect(|r| r.requester_id == requester_id).await)
    }

    async fn list_all(&self) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.collect(|_| true).await)
    }
}
