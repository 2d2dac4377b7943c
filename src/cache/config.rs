//! Store configuration.

use std::time::Duration;

/// Default time-to-live for cached upstream responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Configuration for an [`ExpiringStore`](super::ExpiringStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Time-to-live for entries.
    /// A lookup at or after `created_at + ttl` is a miss.
    pub ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
        }
    }
}

impl StoreConfig {
    /// Create a store config with the given TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl }
    }
}
