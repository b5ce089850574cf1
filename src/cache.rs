use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::trace;

pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtlPolicy {
    /// Each key expires on its own stamp.
    #[default]
    PerKey,
    /// One stamp for the whole cache; any `put` refreshes every key.
    Shared,
}

impl TtlPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_key" | "per-key" | "perkey" => Some(TtlPolicy::PerKey),
            "shared" | "global" => Some(TtlPolicy::Shared),
            _ => None,
        }
    }
}

/// Time-boxed cache for listings. A read hits iff `now - stamp < ttl`.
#[derive(Debug)]
pub struct ReadThroughCache<K, V> {
    ttl: Duration,
    policy: TtlPolicy,
    entries: HashMap<K, (V, DateTime<Utc>)>,
    shared_stamp: Option<DateTime<Utc>>,
}

impl<K: Eq + Hash + Clone, V: Clone> ReadThroughCache<K, V> {
    pub fn new(ttl: Duration, policy: TtlPolicy) -> Self {
        Self {
            ttl,
            policy,
            entries: HashMap::new(),
            shared_stamp: None,
        }
    }

    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let (value, own_stamp) = self.entries.get(key)?;
        let stamp = match self.policy {
            TtlPolicy::PerKey => *own_stamp,
            TtlPolicy::Shared => self.shared_stamp?,
        };
        if now - stamp < self.ttl {
            Some(value.clone())
        } else {
            trace!("cache entry stale");
            None
        }
    }

    pub fn put(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(key, (value, now));
        self.shared_stamp = Some(now);
    }

    /// Cached value if fresh, otherwise `load` and remember its result.
    /// Load errors are returned and leave the cache untouched.
    pub fn get_or_load<E, F>(&mut self, key: K, now: DateTime<Utc>, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(v) = self.get(&key, now) {
            return Ok(v);
        }
        let v = load()?;
        self.put(key, v.clone(), now);
        Ok(v)
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.shared_stamp = None;
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).single().expect("date")
    }

    fn cache(policy: TtlPolicy) -> ReadThroughCache<i64, Vec<&'static str>> {
        ReadThroughCache::new(Duration::seconds(DEFAULT_TTL_SECS), policy)
    }

    #[test]
    fn entry_is_fresh_for_just_under_five_minutes() {
        let mut c = cache(TtlPolicy::PerKey);
        c.put(1, vec!["a"], t0());
        assert_eq!(c.get(&1, t0() + Duration::seconds(4 * 60 + 59)), Some(vec!["a"]));
        assert_eq!(c.get(&1, t0() + Duration::seconds(5 * 60 + 1)), None);
        assert_eq!(c.get(&1, t0() + Duration::seconds(5 * 60)), None);
    }

    #[test]
    fn per_key_stamps_are_independent() {
        let mut c = cache(TtlPolicy::PerKey);
        c.put(1, vec!["a"], t0());
        c.put(2, vec!["b"], t0() + Duration::minutes(4));
        let later = t0() + Duration::minutes(6);
        assert_eq!(c.get(&1, later), None);
        assert_eq!(c.get(&2, later), Some(vec!["b"]));
    }

    #[test]
    fn shared_policy_refreshes_every_key_on_any_put() {
        let mut c = cache(TtlPolicy::Shared);
        c.put(1, vec!["a"], t0());
        c.put(2, vec!["b"], t0() + Duration::minutes(4));
        assert_eq!(c.get(&1, t0() + Duration::minutes(6)), Some(vec!["a"]));
    }

    #[test]
    fn invalidate_all_forces_misses() {
        let mut c = cache(TtlPolicy::Shared);
        c.put(1, vec!["a"], t0());
        c.invalidate_all();
        assert_eq!(c.get(&1, t0()), None);
        assert!(c.is_empty());
    }

    #[test]
    fn load_errors_are_not_cached() {
        let mut c = cache(TtlPolicy::PerKey);
        let r: Result<_, &str> = c.get_or_load(1, t0(), || Err("offline"));
        assert!(r.is_err());
        assert!(c.is_empty());
        let v: Result<_, &str> = c.get_or_load(1, t0(), || Ok(vec!["x"]));
        assert_eq!(v, Ok(vec!["x"]));
        let v: Result<_, &str> = c.get_or_load(1, t0(), || Err("not called"));
        assert_eq!(v, Ok(vec!["x"]));
    }
}
