use crate::cache::{TtlPolicy, DEFAULT_TTL_SECS};
use chrono::Duration;

pub const ENV_LOG: &str = "COURSETEAMSD_LOG";
pub const ENV_CACHE_TTL_SECS: &str = "COURSETEAMSD_CACHE_TTL_SECS";
pub const ENV_CACHE_POLICY: &str = "COURSETEAMSD_CACHE_POLICY";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub log_filter: String,
    pub cache_ttl: Duration,
    pub cache_policy: TtlPolicy,
    /// Problems found while loading; logged once the subscriber is up.
    pub warnings: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            cache_ttl: Duration::seconds(DEFAULT_TTL_SECS),
            cache_policy: TtlPolicy::default(),
            warnings: Vec::new(),
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Invalid values keep their defaults and leave a warning behind.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup(ENV_LOG).map(|s| s.trim().to_string()) {
            if !v.is_empty() {
                cfg.log_filter = v;
            }
        }

        if let Some(raw) = lookup(ENV_CACHE_TTL_SECS) {
            match raw.trim().parse::<i64>() {
                Ok(secs) if secs >= 0 => cfg.cache_ttl = Duration::seconds(secs),
                _ => cfg
                    .warnings
                    .push(format!("ignoring {ENV_CACHE_TTL_SECS}={raw:?}: expected seconds")),
            }
        }

        if let Some(raw) = lookup(ENV_CACHE_POLICY) {
            match TtlPolicy::parse(&raw) {
                Some(p) => cfg.cache_policy = p,
                None => cfg.warnings.push(format!(
                    "ignoring {ENV_CACHE_POLICY}={raw:?}: expected per_key or shared"
                )),
            }
        }

        cfg
    }
}
