//! Batcher configuration.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_micros(100);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_THREAD_NAME: &str = "request-batcher";

/// Tuning knobs for a [`RequestBatcher`](super::RequestBatcher).
///
/// Durations are (de)serialized as integers so the config can sit in a
/// JSON/YAML file next to the rest of an application's settings:
///
/// ```json
/// { "batch_size": 16, "flush_interval_us": 250 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Maximum number of requests per dispatch call.
    pub batch_size: usize,
    /// How long a partial batch may keep growing after its first request arrived.
    #[serde(rename = "flush_interval_us", with = "duration_us")]
    pub flush_interval: Duration,
    /// Bound on the worker's idle wait, i.e. how quickly it notices shutdown.
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
    /// How long `shutdown()` waits for the worker to finish its final drain.
    #[serde(rename = "join_timeout_ms", with = "duration_ms")]
    pub join_timeout: Duration,
    /// Name of the worker OS thread.
    pub thread_name: String,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl BatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_flush_interval(mut self, d: Duration) -> Self {
        self.flush_interval = d;
        self
    }

    pub fn with_poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    pub fn with_join_timeout(mut self, d: Duration) -> Self {
        self.join_timeout = d;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Defaults, overridden by environment variables when present:
    /// - `REQUEST_BATCHER_BATCH_SIZE`
    /// - `REQUEST_BATCHER_FLUSH_INTERVAL_US`
    /// - `REQUEST_BATCHER_POLL_INTERVAL_MS`
    /// - `REQUEST_BATCHER_JOIN_TIMEOUT_MS`
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply the `REQUEST_BATCHER_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = env_parse::<usize>("REQUEST_BATCHER_BATCH_SIZE") {
            self.batch_size = n;
        }
        if let Some(us) = env_parse::<u64>("REQUEST_BATCHER_FLUSH_INTERVAL_US") {
            self.flush_interval = Duration::from_micros(us);
        }
        if let Some(ms) = env_parse::<u64>("REQUEST_BATCHER_POLL_INTERVAL_MS") {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("REQUEST_BATCHER_JOIN_TIMEOUT_MS") {
            self.join_timeout = Duration::from_millis(ms);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(invalid("config.batch_size", "batch_size must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid(
                "config.poll_interval",
                "poll_interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, msg: &str) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("batcher_config"),
    )
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

mod duration_us {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_micros() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_micros)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
