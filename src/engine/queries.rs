use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::model::*;
use crate::observability::AVAILABILITY_QUERIES_TOTAL;

use super::availability::{free_slots, free_windows};
use super::{Engine, EngineError};

/// Most recent date first, then latest start first.
fn newest_first(reservations: &mut [Reservation]) {
    reservations.sort_by(|a, b| b.date.cmp(&a.date).then(b.start.cmp(&a.start)));
}

fn from_ms(ms: Ms) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

impl Engine {
    /// Unreserved slots of the facility grid for a court on a `YYYY-MM-DD` date.
    /// Inactive courts can still be queried.
    pub async fn available_slots(
        &self,
        court_id: Ulid,
        date: &str,
    ) -> Result<SlotAvailability, EngineError> {
        self.court(court_id).await?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| EngineError::InvalidDate(date.to_string()))?;
        self.slots_for(court_id, date).await
    }

    pub async fn available_slots_on(
        &self,
        court_id: Ulid,
        date: NaiveDate,
    ) -> Result<SlotAvailability, EngineError> {
        self.court(court_id).await?;
        self.slots_for(court_id, date).await
    }

    async fn slots_for(&self, court_id: Ulid, date: NaiveDate) -> Result<SlotAvailability, EngineError> {
        metrics::counter!(AVAILABILITY_QUERIES_TOTAL).increment(1);
        let reserved: Vec<Span> = self
            .store
            .find_active_reservations(court_id, date)
            .await?
            .iter()
            .map(Reservation::span)
            .collect();

        Ok(SlotAvailability {
            court_id,
            date,
            slots: free_slots(&self.slots, date, &reserved),
            reserved_count: reserved.len(),
        })
    }

    /// Free stretches of the operating window, for bookings that do not
    /// follow the slot grid.
    pub async fn free_windows(
        &self,
        court_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<(NaiveDateTime, NaiveDateTime)>, EngineError> {
        self.court(court_id).await?;
        let reserved: Vec<Span> = self
            .store
            .find_active_reservations(court_id, date)
            .await?
            .iter()
            .map(Reservation::span)
            .collect();

        Ok(free_windows(&self.slots, date, &reserved)
            .into_iter()
            .filter_map(|s| Some((from_ms(s.start)?, from_ms(s.end)?)))
            .collect())
    }

    pub async fn get_reservation(
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
        Ok(reservation)
    }

    /// The requester's own reservations, newest first.
    pub async fn reservations_for(&self, requester_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        let mut mine = self.store.list_by_requester(requester_id).await?;
        newest_first(&mut mine);
        Ok(mine)
    }

    /// Every reservation, newest first. Administrators only.
    pub async fn all_reservations(&self, requester_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        if !self.auth.is_admin(requester_id) {
            return Err(EngineError::Forbidden(requester_id));
        }
        let mut all = self.store.list_all().await?;
        newest_first(&mut all);
        Ok(all)
    }
}
