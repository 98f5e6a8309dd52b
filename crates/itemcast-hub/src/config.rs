//! Hub and connection pump settings.

use std::time::Duration;

use serde::Deserialize;

/// Default outbound queue capacity per subscriber.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Hub settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Outbound queue capacity for subscribers registered with [`crate::Hub::register`].
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Per-connection keepalive and deadline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Seconds between keepalive pings.
    pub ping_interval_secs: u64,
    /// Seconds a single transport write may take.
    pub write_timeout_secs: u64,
    /// Seconds without a pong before the peer is considered dead.
    pub read_timeout_secs: u64,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
}

impl PumpConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs.max(1))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(1))
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            write_timeout_secs: 10,
            read_timeout_secs: 60,
            max_message_size: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: PumpConfig = serde_json::from_str(r#"{ "read_timeout_secs": 90 }"#).unwrap();
        assert_eq!(config.read_timeout(), Duration::from_secs(90));
        assert_eq!(config.ping_interval(), Duration::from_secs(30));
        assert_eq!(config.max_message_size, 512);
    }

    #[test]
    fn test_zero_durations_are_clamped() {
        let config = PumpConfig {
            ping_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.ping_interval(), Duration::from_secs(1));
    }
}
