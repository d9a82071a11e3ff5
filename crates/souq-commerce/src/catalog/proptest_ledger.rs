//! Property-based tests for inventory record arithmetic.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use super::inventory::{InventoryRecord, StockKey};
use crate::ids::{StoreFrontId, VariantId};

#[derive(Debug, Clone)]
enum Op {
    Adjust(i64),
    Reserve(i64),
    Release(i64),
    Deduct(i64),
    Restock(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-200i64..200).prop_map(Op::Adjust),
        (-5i64..60).prop_map(Op::Reserve),
        (-5i64..60).prop_map(Op::Release),
        (-5i64..60).prop_map(Op::Deduct),
        (-5i64..60).prop_map(Op::Restock),
    ]
}

fn record(quantity: i64) -> InventoryRecord {
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut record = InventoryRecord::empty(StockKey::new(VariantId::new(1), StoreFrontId::new(1)), at);
    record.quantity = quantity;
    record
}

fn apply(record: &mut InventoryRecord, op: &Op) -> bool {
    match *op {
        Op::Adjust(delta) => record.adjust(delta).is_ok(),
        Op::Reserve(qty) => record.reserve(qty).is_ok(),
        Op::Release(qty) => record.release(qty).is_ok(),
        Op::Deduct(qty) => record.confirm_deduct(qty).is_ok(),
        Op::Restock(qty) => record.restock(qty).is_ok(),
    }
}

proptest! {
    /// After any sequence of operations both invariants still hold.
    #[test]
    fn prop_record_stays_consistent(
        initial in 0i64..500,
        ops in prop::collection::vec(op_strategy(), 0..40),
    ) {
        let mut rec = record(initial);
        for op in &ops {
            apply(&mut rec, op);
            prop_assert!(rec.is_consistent(), "after {:?}: {:?}", op, rec);
            prop_assert!(rec.available() >= 0);
        }
    }

    /// A rejected operation leaves the record untouched.
    #[test]
    fn prop_rejected_operation_is_a_noop(
        initial in 0i64..500,
        setup in prop::collection::vec(op_strategy(), 0..20),
        op in op_strategy(),
    ) {
        let mut rec = record(initial);
        for s in &setup {
            apply(&mut rec, s);
        }
        let before = rec.clone();
        if !apply(&mut rec, &op) {
            prop_assert_eq!(rec, before);
        }
    }

    /// Reserving then releasing the same amount restores the balance.
    #[test]
    fn prop_reserve_release_restores(initial in 1i64..500, qty in 1i64..500) {
        let mut rec = record(initial);
        let before = rec.clone();
        if rec.reserve(qty).is_ok() {
            prop_assert_eq!(rec.available(), initial - qty);
            rec.release(qty).unwrap();
            prop_assert_eq!(rec, before);
        } else {
            prop_assert!(qty > initial);
        }
    }

    /// Confirming a reservation lowers quantity and reserved by the same amount.
    #[test]
    fn prop_confirm_keeps_available(initial in 1i64..500, qty in 1i64..500) {
        let mut rec = record(initial);
        prop_assume!(qty <= initial);
        rec.reserve(qty).unwrap();
        let available = rec.available();
        let previous = rec.confirm_deduct(qty).unwrap();
        prop_assert_eq!(previous, initial);
        prop_assert_eq!(rec.quantity, initial - qty);
        prop_assert_eq!(rec.reserved, 0);
        prop_assert_eq!(rec.available(), available);
    }
}
