use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::MAX_NOTES_LEN;
use crate::model::*;
use crate::observability::{outcome_label, CANCELLATIONS_TOTAL, COMPLETED_TOTAL, RESERVATIONS_TOTAL};
use crate::store::StoreError;

use super::conflict::{check_no_conflict, validate_interval};
use super::pricing::total_price;
use super::{Engine, EngineError};

fn log_rejection<T>(op: &str, result: &Result<T, EngineError>) {
    match result {
        Err(e) if e.is_retryable() => warn!("{op} failed: {e}"),
        Err(e) => debug!("{op} rejected: {e}"),
        Ok(_) => {}
    }
}

impl Engine {
    /// Book `[start, end)` on a court and confirm it immediately.
    pub async fn create_reservation(
        &self,
        requester_id: Ulid,
        court_id: Ulid,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
        notes: Option<String>,
    ) -> Result<Reservation, EngineError> {
        let result = self
            .try_create(requester_id, court_id, date, start, end, notes)
            .await;
        metrics::counter!(RESERVATIONS_TOTAL, "outcome" => outcome_label(&result)).increment(1);
        log_rejection("create_reservation", &result);
        result
    }

    async fn try_create(
        &self,
        requester_id: Ulid,
        court_id: Ulid,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
        notes: Option<String>,
    ) -> Result<Reservation, EngineError> {
        // Input checks never reach a collaborator.
        let span = validate_interval(date, &start, &end)?;
        if let Some(ref n) = notes
            && n.len() > MAX_NOTES_LEN
        {
            return Err(EngineError::LimitExceeded("notes too long"));
        }

        let court = self.court(court_id).await?;
        if !court.is_active {
            return Err(EngineError::CourtNotFound(court_id));
        }

        let existing = self.store.find_active_reservations(court_id, date).await?;
        check_no_conflict(&existing, &span)?;

        let reservation = Reservation {
            id: Ulid::new(),
            court_id,
            requester_id,
            date,
            start,
            end,
            total_price: total_price(court.hourly_rate, &span),
            status: ReservationStatus::Confirmed,
            notes,
        };
        // A concurrent writer may still win between the read above and this
        // insert; the store then reports a conflict, which maps to SlotConflict.
        self.store.insert(reservation.clone()).await?;

        info!(
            "reserved court {court_id} {} {}-{} for {requester_id} as {} ({})",
            date,
            start.format("%H:%M"),
            end.format("%H:%M"),
            reservation.id,
            reservation.total_price
        );
        Ok(reservation)
    }

    /// Cancel a reservation on behalf of its owner or an administrator.
    ///
    /// Cancelling an already cancelled reservation succeeds without writing
    /// anything. A completed reservation cannot be cancelled.
    pub async fn cancel_reservation(
        &self,
        requester_id: Ulid,
        reservation_id: Ulid,
    ) -> Result<Reservation, EngineError> {
        let result = self.try_cancel(requester_id, reservation_id).await;
        metrics::counter!(CANCELLATIONS_TOTAL, "outcome" => outcome_label(&result)).increment(1);
        log_rejection("cancel_reservation", &result);
        result
    }

    async fn try_cancel(
        &self,
        requester_id: Ulid,
        reservation_id: Ulid,
    ) -> Result<Reservation, EngineError> {
        let reservation = self
            .store
            .get(reservation_id)
            .await?
            .ok_or(EngineError::NotFound(reservation_id))?;
        if !self.auth.is_owner_or_admin(requester_id, &reservation) {
            return Err(EngineError::Forbidden(requester_id));
        }

        match reservation.status {
            ReservationStatus::Cancelled => return Ok(reservation),
            ReservationStatus::Completed => {
                return Err(EngineError::InvalidTransition {
                    from: ReservationStatus::Completed,
                    to: ReservationStatus::Cancelled,
                });
            }
            ReservationStatus::Pending | ReservationStatus::Confirmed => {}
        }

        // The store re-checks the status, so a completion that landed after
        // the read above surfaces as InvalidTransition.
        let updated = self
            .store
            .update_status(reservation_id, ReservationStatus::Cancelled)
            .await?;
        info!("cancelled reservation {reservation_id} by {requester_id}");
        Ok(updated)
    }

    /// Archive every active reservation whose window ended at or before `now`.
    /// Returns the ids moved to COMPLETED.
    pub async fn complete_elapsed(&self, now: NaiveDateTime) -> Result<Vec<Ulid>, EngineError> {
        let elapsed: Vec<Ulid> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.is_active() && r.end <= now)
            .map(|r| r.id)
            .collect();

        let mut completed = Vec::with_capacity(elapsed.len());
        for id in elapsed {
            match self.store.update_status(id, ReservationStatus::Completed).await {
                Ok(_) => completed.push(id),
                // Cancelled since the listing; it stays cancelled.
                Err(StoreError::InvalidTransition { from, .. }) => {
                    debug!("skipped completing {id}: now {from}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        if !completed.is_empty() {
            metrics::counter!(COMPLETED_TOTAL).increment(completed.len() as u64);
            info!("completed {} elapsed reservations", completed.len());
        }
        Ok(completed)
    }
}
