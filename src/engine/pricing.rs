use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::{MS_PER_HOUR, Span};

/// Minor-unit digits of the currency.
const PRICE_SCALE: u32 = 2;

/// `hours * hourly_rate`, rounded half-up to the currency's minor unit.
pub fn total_price(hourly_rate: Decimal, span: &Span) -> Decimal {
    let raw = hourly_rate * Decimal::from(span.duration_ms()) / Decimal::from(MS_PER_HOUR);
    let mut price = raw.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    price.rescale(PRICE_SCALE);
    price
}
