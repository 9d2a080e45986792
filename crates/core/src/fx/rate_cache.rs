use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::time::{Duration, Instant};

type RateKey = (String, String, NaiveDate);

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: Decimal,
    inserted_at: Instant,
}

/// Time-bounded cache of resolved rates keyed by (from, to, date).
///
/// Entries hold the major-currency rate; minor-unit multipliers are applied
/// by the caller. Any write to the rate store clears the whole cache, since a
/// cross rate may depend on the pair that changed.
#[derive(Debug)]
pub struct RateCache {
    entries: DashMap<RateKey, CachedRate>,
    ttl: Duration,
}

impl RateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, from: &str, to: &str, date: NaiveDate) -> Option<Decimal> {
        let key = (from.to_string(), to.to_string(), date);
        let cached = self.entries.get(&key).map(|entry| *entry.value())?;
        if cached.inserted_at.elapsed() <= self.ttl {
            return Some(cached.rate);
        }
        self.entries.remove(&key);
        None
    }

    pub fn insert(&self, from: &str, to: &str, date: NaiveDate, rate: Decimal) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            (from.to_string(), to.to_string(), date),
            CachedRate {
                rate,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
