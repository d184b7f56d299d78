use ulid::Ulid;

use crate::model::ReservationStatus;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Court absent from the catalog, or inactive when booking.
    CourtNotFound(Ulid),
    InvalidInterval(&'static str),
    InvalidDate(String),
    /// Overlaps the given active reservation.
    SlotConflict(Ulid),
    NotFound(Ulid),
    /// The requester may not act on the target.
    Forbidden(Ulid),
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    LimitExceeded(&'static str),
    /// Infrastructure fault in a collaborator. Worth retrying later.
    Storage(String),
}

impl EngineError {
    /// True only for infrastructure faults. Business errors need a different request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::CourtNotFound(id) => write!(f, "court not found or not active: {id}"),
            EngineError::InvalidInterval(msg) => write!(f, "invalid interval: {msg}"),
            EngineError::InvalidDate(s) => {
                write!(f, "invalid date {s:?}: expected YYYY-MM-DD")
            }
            EngineError::SlotConflict(id) => {
                write!(f, "time slot already reserved by {id}")
            }
            EngineError::NotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::Forbidden(id) => write!(f, "requester {id} is not authorized"),
            EngineError::InvalidTransition { from, to } => {
                write!(f, "cannot move reservation from {from} to {to}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(id) => EngineError::SlotConflict(id),
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::InvalidTransition { from, to } => EngineError::InvalidTransition { from, to },
            StoreError::Unavailable(msg) => EngineError::Storage(msg),
        }
    }
}
