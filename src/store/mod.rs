mod wal_store;

pub use wal_store::{SharedLedger, WalStore};

use async_trait::async_trait;
use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{Reservation, ReservationStatus};

/// Failure reported by a persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Exclusion constraint: an active reservation already covers part of
    /// the interval. Carries the id of the reservation that won.
    Conflict(Ulid),
    NotFound(Ulid),
    /// The stored status is terminal and differs from the requested one.
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    /// Connectivity, I/O, or any fault unrelated to booking conflicts.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(id) => write!(f, "overlaps active reservation {id}"),
            StoreError::NotFound(id) => write!(f, "reservation not found: {id}"),
            StoreError::InvalidTransition { from, to } => {
                write!(f, "cannot move reservation from {from} to {to}")
            }
            StoreError::Unavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Reservation persistence.
///
/// `insert` must be atomic with respect to the overlap check: two
/// concurrent inserts of overlapping active reservations on the same court
/// must not both succeed. The loser gets `StoreError::Conflict`.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Reservations on `(court_id, date)` with status PENDING or CONFIRMED.
    async fn find_active_reservations(
        &self,
        court_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError>;

    async fn get(&self, id: Ulid) -> Result<Option<Reservation>, StoreError>;

    async fn insert(&self, reservation: Reservation) -> Result<(), StoreError>;

    /// Set the status of an existing reservation and return the updated row.
    ///
    /// Checked against the stored status atomically: a reservation already
    /// in `status` is returned unchanged without a write, and a terminal
    /// status never changes (`StoreError::InvalidTransition`).
    async fn update_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
    ) -> Result<Reservation, StoreError>;

    async fn list_by_requester(&self, requester_id: Ulid) -> Result<Vec<Reservation>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Reservation>, StoreError>;
}
