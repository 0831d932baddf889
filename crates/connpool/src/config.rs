//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Lower bound applied to the idle check interval.
///
/// Balancing more often than this only burns CPU on draining and refilling
/// the idle queue.
pub const MIN_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for a connection pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Number of connections opened on init and kept by the balancer.
    pub min_active: usize,

    /// Upper bound on live connections (idle plus borrowed).
    pub max_active: usize,

    /// Maximum time `borrow` waits for an idle connection.
    pub max_wait_time: Duration,

    /// Idle connections older than this are evicted above `min_active`.
    pub max_idle_time: Duration,

    /// How often the balancer runs. Floored at [`MIN_IDLE_CHECK_INTERVAL`].
    pub idle_check_interval: Duration,

    /// Maximum number of disconnects running at the same time.
    pub disconnect_concurrency: usize,

    /// Number of discarded connections that may wait for a disconnect slot.
    pub disconnect_queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_active: 20,
            max_active: 100,
            max_wait_time: Duration::from_secs(5),
            max_idle_time: Duration::from_secs(30),
            idle_check_interval: Duration::from_secs(15),
            disconnect_concurrency: 4,
            disconnect_queue_capacity: 256,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value;key=value` option string.
    ///
    /// Recognized keys (case-insensitive) are `minActive`, `maxActive`,
    /// `maxWaitTime`, `maxIdleTime` and `idleCheckInterval`; times are in
    /// seconds and may be fractional:
    ///
    /// ```text
    /// minActive=10;maxActive=30;maxWaitTime=5;maxIdleTime=20;idleCheckInterval=10
    /// ```
    pub fn from_options(options: &str) -> Result<Self, PoolError> {
        let mut config = Self::default();

        for part in options.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| PoolError::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "minactive" | "min_active" => config.min_active = parse_count(&key, value)?,
                "maxactive" | "max_active" => config.max_active = parse_count(&key, value)?,
                "maxwaittime" | "max_wait_time" => {
                    config.max_wait_time = parse_seconds(&key, value)?;
                }
                "maxidletime" | "max_idle_time" => {
                    config.max_idle_time = parse_seconds(&key, value)?;
                }
                "idlecheckinterval" | "idle_check_interval" => {
                    config.idle_check_interval = parse_seconds(&key, value)?;
                }
                _ => {
                    // Ignore unknown options for forward compatibility
                    tracing::debug!(key = key, value = value, "ignoring unknown pool option");
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the minimum number of active connections.
    #[must_use]
    pub fn min_active(mut self, count: usize) -> Self {
        self.min_active = count;
        self
    }

    /// Set the maximum number of active connections.
    #[must_use]
    pub fn max_active(mut self, count: usize) -> Self {
        self.max_active = count;
        self
    }

    /// Set the maximum time to wait for a connection.
    #[must_use]
    pub fn max_wait_time(mut self, timeout: Duration) -> Self {
        self.max_wait_time = timeout;
        self
    }

    /// Set the idle time after which surplus connections are evicted.
    #[must_use]
    pub fn max_idle_time(mut self, timeout: Duration) -> Self {
        self.max_idle_time = timeout;
        self
    }

    /// Set the balancer interval.
    #[must_use]
    pub fn idle_check_interval(mut self, interval: Duration) -> Self {
        self.idle_check_interval = interval;
        self
    }

    /// Set the maximum number of concurrent disconnects.
    #[must_use]
    pub fn disconnect_concurrency(mut self, count: usize) -> Self {
        self.disconnect_concurrency = count;
        self
    }

    /// Set the capacity of the disconnect queue.
    #[must_use]
    pub fn disconnect_queue_capacity(mut self, capacity: usize) -> Self {
        self.disconnect_queue_capacity = capacity;
        self
    }

    /// The balancer interval actually used, after applying the floor.
    #[must_use]
    pub fn effective_idle_check_interval(&self) -> Duration {
        self.idle_check_interval.max(MIN_IDLE_CHECK_INTERVAL)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_active == 0 {
            return Err(PoolError::Config(
                "max_active must be greater than 0".to_string(),
            ));
        }

        if self.min_active > self.max_active {
            return Err(PoolError::Config(format!(
                "min_active ({}) cannot exceed max_active ({})",
                self.min_active, self.max_active
            )));
        }

        if self.disconnect_concurrency == 0 {
            return Err(PoolError::Config(
                "disconnect_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.disconnect_queue_capacity == 0 {
            return Err(PoolError::Config(
                "disconnect_queue_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, PoolError> {
    value
        .parse()
        .map_err(|_| PoolError::Config(format!("invalid {key}: {value}")))
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, PoolError> {
    let secs: f64 = value
        .parse()
        .map_err(|_| PoolError::Config(format!("invalid {key}: {value}")))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| PoolError::Config(format!("invalid {key}: {value}")))
}

/// Pool options as they appear in configuration documents.
///
/// Keys use the camelCase names of the option string and times are in
/// seconds. Missing keys fall back to [`PoolConfig::default`].
///
/// ```json
/// { "minActive": 10, "maxActive": 30, "maxWaitTime": 5, "maxIdleTime": 20 }
/// ```
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolOptions {
    /// See [`PoolConfig::min_active`].
    pub min_active: Option<usize>,
    /// See [`PoolConfig::max_active`].
    pub max_active: Option<usize>,
    /// Seconds; see [`PoolConfig::max_wait_time`].
    pub max_wait_time: Option<f64>,
    /// Seconds; see [`PoolConfig::max_idle_time`].
    pub max_idle_time: Option<f64>,
    /// Seconds; see [`PoolConfig::idle_check_interval`].
    pub idle_check_interval: Option<f64>,
    /// See [`PoolConfig::disconnect_concurrency`].
    pub disconnect_concurrency: Option<usize>,
    /// See [`PoolConfig::disconnect_queue_capacity`].
    pub disconnect_queue_capacity: Option<usize>,
}

#[cfg(feature = "serde")]
impl TryFrom<PoolOptions> for PoolConfig {
    type Error = PoolError;

    fn try_from(options: PoolOptions) -> Result<Self, Self::Error> {
        let seconds = |key: &str, secs: f64| {
            Duration::try_from_secs_f64(secs)
                .map_err(|_| PoolError::Config(format!("invalid {key}: {secs}")))
        };

        let mut config = Self::default();
        if let Some(count) = options.min_active {
            config.min_active = count;
        }
        if let Some(count) = options.max_active {
            config.max_active = count;
        }
        if let Some(secs) = options.max_wait_time {
            config.max_wait_time = seconds("maxWaitTime", secs)?;
        }
        if let Some(secs) = options.max_idle_time {
            config.max_idle_time = seconds("maxIdleTime", secs)?;
        }
        if let Some(secs) = options.idle_check_interval {
            config.idle_check_interval = seconds("idleCheckInterval", secs)?;
        }
        if let Some(count) = options.disconnect_concurrency {
            config.disconnect_concurrency = count;
        }
        if let Some(capacity) = options.disconnect_queue_capacity {
            config.disconnect_queue_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }
}
