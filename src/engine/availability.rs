use chrono::{Duration, NaiveDate, NaiveTime, Timelike};

use crate::model::*;

/// The facility's fixed slot grid: `count` contiguous slots of
/// `slot_minutes` each, starting at `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCatalog {
    open: NaiveTime,
    count: u32,
    slot_minutes: u32,
}

impl Default for SlotCatalog {
    /// 12:00–20:00 in one-hour slots.
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            count: 8,
            slot_minutes: 60,
        }
    }
}

const MINUTES_PER_DAY: u64 = 24 * 60;

impl SlotCatalog {
    /// The grid must be non-empty and end no later than midnight.
    pub fn new(open: NaiveTime, count: u32, slot_minutes: u32) -> Result<Self, String> {
        if count == 0 || slot_minutes == 0 {
            return Err("slot catalog needs at least one non-empty slot".into());
        }
        let open_minute = u64::from(open.num_seconds_from_midnight()).div_ceil(60);
        let close_minute = open_minute + u64::from(count) * u64::from(slot_minutes);
        if close_minute > MINUTES_PER_DAY {
            return Err(format!(
                "{count} slots of {slot_minutes} min from {} run past midnight",
                open.format("%H:%M")
            ));
        }
        Ok(Self {
            open,
            count,
            slot_minutes,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.count as usize
    }

    pub fn slots(&self) -> Vec<Slot> {
        let len = Duration::minutes(i64::from(self.slot_minutes));
        (0..self.count)
            .map(|i| {
                let start = self.open + len * i as i32;
                Slot::new(start, start + len)
            })
            .collect()
    }

    /// The whole operating window on `date`.
    pub fn operating_span(&self, date: NaiveDate) -> Span {
        let start = date.and_time(self.open);
        let end = start + Duration::minutes(i64::from(self.count * self.slot_minutes));
        Span::between(&start, &end)
    }
}

// ── Availability Algorithm ────────────────────────────────────────

/// Slots of `catalog` on `date` that overlap none of `reserved`.
pub fn free_slots(catalog: &SlotCatalog, date: NaiveDate, reserved: &[Span]) -> Vec<Slot> {
    catalog
        .slots()
        .into_iter()
        .filter(|slot| {
            let span = slot.span_on(date);
            !reserved.iter().any(|r| r.overlaps(&span))
        })
        .collect()
}

/// Free stretches of the operating window: the window minus the merged
/// reserved spans.
pub fn free_windows(catalog: &SlotCatalog, date: NaiveDate, reserved: &[Span]) -> Vec<Span> {
    let mut taken = reserved.to_vec();
    taken.sort_by_key(|s| s.start);
    subtract_intervals(&[catalog.operating_span(date)], &merge_overlapping(&taken))
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Remove sorted, disjoint `to_remove` spans from sorted, disjoint `base` spans.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < b.end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < b.end {
            result.push(Span::new(current_start, b.end));
        }
    }

    result
}
