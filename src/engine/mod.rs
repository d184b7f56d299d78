mod availability;
mod conflict;
mod error;
mod mutations;
mod pricing;
mod queries;
#[cfg(test)]
mod proptests;

pub use availability::{free_slots, free_windows, merge_overlapping, subtract_intervals, SlotCatalog};
pub use error::EngineError;
pub use pricing::total_price;

use std::sync::Arc;

use ulid::Ulid;

use crate::auth::Authorizer;
use crate::catalog::CourtDirectory;
use crate::model::Court;
use crate::store::ReservationStore;

/// The reservation scheduling engine.
///
/// Holds no booking state of its own: every call reads and writes through
/// the injected collaborators, so one `Arc<Engine>` can serve any number of
/// concurrent callers. Atomicity of check-then-insert is the store's
/// responsibility (see [`ReservationStore`]).
pub struct Engine {
    courts: Arc<dyn CourtDirectory>,
    store: Arc<dyn ReservationStore>,
    auth: Arc<dyn Authorizer>,
    slots: SlotCatalog,
}

impl Engine {
    pub fn new(
        courts: Arc<dyn CourtDirectory>,
        store: Arc<dyn ReservationStore>,
        auth: Arc<dyn Authorizer>,
        slots: SlotCatalog,
    ) -> Self {
        Self {
            courts,
            store,
            auth,
            slots,
        }
    }

    /// Lookup a court regardless of its active flag.
    async fn court(&self, court_id: Ulid) -> Result<Court, EngineError> {
        self.courts
            .find_court(court_id)
            .await?
            .ok_or(EngineError::CourtNotFound(court_id))
    }
}
