//! Property tests for the overlap predicate and the no-double-booking
//! guarantee of the engine under random create/cancel sequences.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::Decimal;
use ulid::Ulid;

use super::*;
use crate::auth::RoleDirectory;
use crate::catalog::InMemoryCourts;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::store::{ReservationStore, WalStore};

#[derive(Debug, Clone)]
enum Op {
    Book { start_min: u32, len_min: u32 },
    Cancel { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u32..(24 * 60 - 15), 15u32..=240).prop_map(|(start_min, len_min)| Op::Book { start_min, len_min }),
        1 => any::<usize>().prop_map(|pick| Op::Cancel { pick }),
    ]
}

fn span_strategy() -> impl Strategy<Value = Span> {
    (0i64..10_000, 1i64..1_000).prop_map(|(s, len)| Span::new(s, s + len))
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

fn minute(m: u32) -> NaiveDateTime {
    day().and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::minutes(i64::from(m))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn overlap_is_symmetric(a in span_strategy(), b in span_strategy()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn adjacent_spans_never_overlap(s in 0i64..10_000, l1 in 1i64..500, l2 in 1i64..500) {
        let first = Span::new(s, s + l1);
        let second = Span::new(s + l1, s + l1 + l2);
        prop_assert!(!first.overlaps(&second));
    }

    #[test]
    fn free_slots_never_touch_reserved(
        reserved in prop::collection::vec((12u32 * 60..20 * 60, 15u32..=180), 0..6),
    ) {
        let spans: Vec<Span> = reserved
            .iter()
            .map(|&(s, l)| Span::between(&minute(s), &minute((s + l).min(24 * 60))))
            .collect();
        let catalog = SlotCatalog::default();
        for slot in free_slots(&catalog, day(), &spans) {
            let slot_span = slot.span_on(day());
            prop_assert!(spans.iter().all(|r| !r.overlaps(&slot_span)));
        }
    }

    #[test]
    fn active_reservations_never_overlap(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let overlaps = rt.block_on(async move {
            let dir = std::env::temp_dir().join("courtbook_test_proptest");
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join(format!("{}.wal", Ulid::new()));
            let store = Arc::new(WalStore::open(&path, Arc::new(NotifyHub::new())).unwrap());
            let courts = Arc::new(InMemoryCourts::new());
            let court = Ulid::new();
            courts.upsert(Court::new(court, Decimal::new(60, 0), true));
            let engine = Engine::new(courts, store.clone(), Arc::new(RoleDirectory::new()), SlotCatalog::default());
            let owner = Ulid::new();

            let mut booked: Vec<Ulid> = Vec::new();
            for op in ops {
                match op {
                    Op::Book { start_min, len_min } => {
                        let end = (start_min + len_min).min(24 * 60);
                        match engine
                            .create_reservation(owner, court, day(), minute(start_min), minute(end), None)
                            .await
                        {
                            Ok(r) => booked.push(r.id),
                            Err(EngineError::SlotConflict(_)) => {}
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                    Op::Cancel { pick } if !booked.is_empty() => {
                        let id = booked[pick % booked.len()];
                        engine.cancel_reservation(owner, id).await.unwrap();
                    }
                    Op::Cancel { .. } => {}
                }
            }

            let active = store.find_active_reservations(court, day()).await.unwrap();
            let _ = std::fs::remove_file(&path);
            let mut bad = 0;
            for (i, a) in active.iter().enumerate() {
                for b in &active[i + 1..] {
                    if a.span().overlaps(&b.span()) {
                        bad += 1;
                    }
                }
            }
            bad
        });
        prop_assert_eq!(overlaps, 0);
    }
}
