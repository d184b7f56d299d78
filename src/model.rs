use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds of a naive date-time in the canonical zone.
pub type Ms = i64;

pub const MS_PER_HOUR: Ms = 3_600_000;

pub fn to_ms(dt: &NaiveDateTime) -> Ms {
    dt.and_utc().timestamp_millis()
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn between(start: &NaiveDateTime, end: &NaiveDateTime) -> Self {
        Self::new(to_ms(start), to_ms(end))
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// The overlap predicate. Touching endpoints do not overlap, so
    /// back-to-back bookings are allowed.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Court projection owned by the external catalog. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: Ulid,
    /// Price per hour in the currency's major unit. Always positive.
    pub hourly_rate: Decimal,
    pub is_active: bool,
}

impl Court {
    pub fn new(id: Ulid, hourly_rate: Decimal, is_active: bool) -> Self {
        debug_assert!(hourly_rate > Decimal::ZERO, "hourly rate must be positive");
        Self {
            id,
            hourly_rate,
            is_active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    /// Awaiting approval. Never produced by the create path, but occupies capacity.
    Pending,
    Confirmed,
    Cancelled,
    /// Archived after the booked window has elapsed.
    Completed,
}

impl ReservationStatus {
    /// Only active reservations occupy capacity.
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReservationStatus::Cancelled | ReservationStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub court_id: Ulid,
    pub requester_id: Ulid,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total_price: Decimal,
    pub status: ReservationStatus,
    pub notes: Option<String>,
}

impl Reservation {
    pub fn span(&self) -> Span {
        Span::between(&self.start, &self.end)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// A fixed-length candidate booking interval inside operating hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub label: String,
}

impl Slot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        let label = format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"));
        Self { start, end, label }
    }

    /// The slot's interval on a given day. A slot ending at 00:00 ends on the next day.
    pub fn span_on(&self, date: NaiveDate) -> Span {
        let start = date.and_time(self.start);
        let mut end = date.and_time(self.end);
        if end <= start {
            end += chrono::Duration::days(1);
        }
        Span::between(&start, &end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAvailability {
    pub court_id: Ulid,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
    pub reserved_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

/// Authenticated caller identity, as handed over by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Ulid,
    pub role: Role,
}

impl Requester {
    pub fn user(id: Ulid) -> Self {
        Self { id, role: Role::User }
    }

    pub fn admin(id: Ulid) -> Self {
        Self { id, role: Role::Admin }
    }
}

/// All reservations of one court (any status), sorted by start.
#[derive(Debug, Clone)]
pub struct CourtLedger {
    pub court_id: Ulid,
    pub reservations: Vec<Reservation>,
}

impl CourtLedger {
    pub fn new(court_id: Ulid) -> Self {
        Self {
            court_id,
            reservations: Vec::new(),
        }
    }

    /// Insert maintaining sort order by start.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.start, |r| r.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn get(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn get_mut(&mut self, id: &Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    /// Active reservations whose span overlaps the query window.
    /// Uses binary search to skip reservations starting at or after `query.end`.
    pub fn overlapping_active(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| to_ms(&r.start) < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.is_active() && r.span().overlaps(query))
    }

    pub fn active_on(&self, date: NaiveDate) -> impl Iterator<Item = &Reservation> {
        self.reservations
            .iter()
            .filter(move |r| r.date == date && r.is_active())
    }
}

/// The WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        reservation: Reservation,
    },
    StatusChanged {
        id: Ulid,
        court_id: Ulid,
        status: ReservationStatus,
    },
}

impl Event {
    pub fn court_id(&self) -> Ulid {
        match self {
            Event::ReservationCreated { reservation } => reservation.court_id,
            Event::StatusChanged { court_id, .. } => *court_id,
        }
    }
}
