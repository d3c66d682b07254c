use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::models::AttendanceRecord;

pub const DEFAULT_TTL_SECS: i64 = 15 * 60;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn is_stale(now: DateTime<Utc>, fetched_at: DateTime<Utc>, ttl: Duration) -> bool {
    now - fetched_at >= ttl
}

#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub data: Arc<Vec<AttendanceRecord>>,
    pub fetched_at: DateTime<Utc>,
}

/// Holds the most recent record snapshot and reloads it once the ttl lapses.
#[derive(Debug)]
pub struct RecordCache<C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    entry: Option<CachedSnapshot>,
}

impl RecordCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> RecordCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entry: None,
        }
    }

    pub fn snapshot(&self) -> Option<&CachedSnapshot> {
        self.entry.as_ref()
    }

    pub fn is_fresh(&self) -> bool {
        self.entry
            .as_ref()
            .map(|entry| !is_stale(self.clock.now(), entry.fetched_at, self.ttl))
            .unwrap_or(false)
    }

    pub fn store(&mut self, data: Vec<AttendanceRecord>) -> Arc<Vec<AttendanceRecord>> {
        let data = Arc::new(data);
        self.entry = Some(CachedSnapshot {
            data: Arc::clone(&data),
            fetched_at: self.clock.now(),
        });
        data
    }

    pub fn get_or_load<F, E>(&mut self, load: F) -> Result<Arc<Vec<AttendanceRecord>>, E>
    where
        F: FnOnce() -> Result<Vec<AttendanceRecord>, E>,
    {
        if self.is_fresh() {
            if let Some(entry) = &self.entry {
                tracing::debug!(fetched_at = %entry.fetched_at, "using cached attendance snapshot");
                return Ok(Arc::clone(&entry.data));
            }
        }

        let data = load()?;
        tracing::debug!(count = data.len(), "refreshed attendance snapshot");
        Ok(self.store(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<DateTime<Utc>>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn staleness_is_a_function_of_age() {
        let ttl = Duration::minutes(15);
        assert!(!is_stale(start() + Duration::minutes(14), start(), ttl));
        assert!(is_stale(start() + Duration::minutes(15), start(), ttl));
    }

    #[test]
    fn serves_cached_snapshot_until_ttl_lapses() {
        let clock = ManualClock(Rc::new(Cell::new(start())));
        let mut cache = RecordCache::with_clock(Duration::seconds(DEFAULT_TTL_SECS), clock.clone());
        let loads = Cell::new(0);
        let loader = || -> Result<Vec<AttendanceRecord>, std::convert::Infallible> {
            loads.set(loads.get() + 1);
            Ok(vec![record("A", "X", &[])])
        };

        cache.get_or_load(loader).unwrap();
        clock.advance(Duration::minutes(10));
        cache.get_or_load(loader).unwrap();
        assert_eq!(loads.get(), 1);

        clock.advance(Duration::minutes(5));
        let data = cache.get_or_load(loader).unwrap();
        assert_eq!(loads.get(), 2);
        assert_eq!(data.len(), 1);
        assert_eq!(
            cache.snapshot().map(|s| s.fetched_at),
            Some(start() + Duration::minutes(15))
        );
    }

    #[test]
    fn failed_load_keeps_cache_empty() {
        let mut cache = RecordCache::new(Duration::minutes(1));
        let result = cache.get_or_load(|| Err::<Vec<AttendanceRecord>, _>("offline"));

        assert_eq!(result.unwrap_err(), "offline");
        assert!(cache.snapshot().is_none());
        assert!(!cache.is_fresh());
    }
}
