//! Timing configuration for the session manager and dashboard cache.

use std::time::Duration;

/// Default safety margin before the real expiry at which the session is ended.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Default interval of the safety-net expiry poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default freshness window of the dashboard snapshot.
pub const DEFAULT_DASHBOARD_TTL: Duration = Duration::from_secs(30);

/// Configuration for session timing.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long before `expiresAt` the precise timer fires.
    pub expiry_margin: Duration,

    /// Interval of the coarse re-check that guards against missed timers.
    pub poll_interval: Duration,

    /// How long a fetched dashboard counts as fresh.
    pub dashboard_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_margin: DEFAULT_EXPIRY_MARGIN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            dashboard_ttl: DEFAULT_DASHBOARD_TTL,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiry safety margin.
    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Set the safety-net poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the dashboard freshness window.
    pub fn with_dashboard_ttl(mut self, ttl: Duration) -> Self {
        self.dashboard_ttl = ttl;
        self
    }

    pub(crate) fn expiry_margin_ms(&self) -> i64 {
        duration_ms(self.expiry_margin)
    }

    pub(crate) fn dashboard_ttl_ms(&self) -> i64 {
        duration_ms(self.dashboard_ttl)
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
