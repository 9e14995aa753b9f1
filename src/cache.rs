//! Read-through memo for course-detail payloads.
//!
//! The viewer tolerates staleness, so entries simply expire after the TTL
//! with no invalidation on write. The clock is injectable so tests can
//! drive expiry deterministically.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Time-boxed cache keyed by course id.
#[derive(Debug)]
pub struct TtlCache<V, C: Clock = SystemClock> {
    entries: HashMap<String, (Instant, V)>,
    ttl: Duration,
    clock: C,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V, C: Clock> TtlCache<V, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let (inserted_at, value) = self.entries.get(key)?;
        if self.clock.now().duration_since(*inserted_at) < self.ttl {
            Some(value)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), (self.clock.now(), value));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone)]
    struct ManualClock {
        base: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + self.offset.get()
        }
    }

    #[test]
    fn entries_expire_after_the_ttl() {
        let clock = ManualClock::new();
        let mut cache = TtlCache::with_clock(DEFAULT_TTL, clock.clone());

        cache.insert("course_1", "payload");
        assert_eq!(cache.get("course_1"), Some(&"payload"));

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get("course_1"), Some(&"payload"));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("course_1"), None);
    }

    #[test]
    fn insert_refreshes_the_entry() {
        let clock = ManualClock::new();
        let mut cache = TtlCache::with_clock(DEFAULT_TTL, clock.clone());

        cache.insert("course_1", 1);
        clock.advance(Duration::from_secs(200));
        cache.insert("course_1", 2);
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.get("course_1"), Some(&2));
    }

    #[test]
    fn unknown_keys_miss() {
        let cache: TtlCache<&str> = TtlCache::default();
        assert_eq!(cache.get("course_9"), None);
    }
}
