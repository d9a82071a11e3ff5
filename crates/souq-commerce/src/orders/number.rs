//! Order number allocation.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Prefix of every order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Hands out `ORD-<token>` numbers where the token is a nanosecond
/// timestamp, bumped so that it strictly increases within the process.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    last: AtomicI64,
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next number for an order placed at `now`.
    pub fn next(&self, now: DateTime<Utc>) -> String {
        let candidate = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let token = candidate.max(current.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(current, token, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return format!("{}{}", ORDER_NUMBER_PREFIX, token),
                Err(observed) => current = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_numbers_increase_for_same_instant() {
        let gen = OrderNumberGenerator::new();
        let now = Utc::now();
        let a = gen.next(now);
        let b = gen.next(now);
        assert!(a.starts_with(ORDER_NUMBER_PREFIX));
        let parse = |s: &str| s[ORDER_NUMBER_PREFIX.len()..].parse::<i64>().unwrap();
        assert_eq!(parse(&b), parse(&a) + 1);
    }

    #[test]
    fn test_numbers_unique_across_threads() {
        let gen = Arc::new(OrderNumberGenerator::new());
        let now = Utc::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || (0..250).map(|_| gen.next(now)).collect::<Vec<_>>())
            })
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for number in handle.join().unwrap() {
                assert!(all.insert(number));
            }
        }
        assert_eq!(all.len(), 1000);
    }
}
