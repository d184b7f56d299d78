use chrono::{NaiveDate, NaiveDateTime};

use crate::model::*;

use super::EngineError;

/// Check a requested window against its calendar day and return its span.
/// An end of exactly the next midnight still lies within the day.
pub(crate) fn validate_interval(
    date: NaiveDate,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> Result<Span, EngineError> {
    if start >= end {
        return Err(EngineError::InvalidInterval("start must be before end"));
    }
    if start.date() != date {
        return Err(EngineError::InvalidInterval("start is not on the reservation date"));
    }
    let next_midnight = date
        .succ_opt()
        .ok_or(EngineError::InvalidInterval("date out of range"))?
        .and_time(chrono::NaiveTime::MIN);
    if *end > next_midnight {
        return Err(EngineError::InvalidInterval("interval spans multiple days"));
    }
    Ok(Span::between(start, end))
}

/// Fail with the first active reservation whose span overlaps `span`.
pub(crate) fn check_no_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Reservation>,
    span: &Span,
) -> Result<(), EngineError> {
    for r in existing {
        if r.is_active() && r.span().overlaps(span) {
            return Err(EngineError::SlotConflict(r.id));
        }
    }
    Ok(())
}
