//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the WebSocket listener
    pub bind_address: SocketAddr,
    /// Clock engine settings
    pub clock: ClockConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 7777)),
            clock: ClockConfig::default(),
        }
    }
}

/// Clock engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Interval between clock ticks for a playing game
    pub tick_interval: Duration,
    /// Elapsed seconds before a tick persists the deduction. Bounds update
    /// frequency without losing accuracy: deductions are always computed
    /// from the last persisted timestamp.
    pub persist_threshold: f64,
    /// Remaining seconds at or below which the side to move is flagged
    pub flag_threshold: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            persist_threshold: 0.2,
            flag_threshold: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert!(config.clock.tick_interval <= Duration::from_millis(100));
        assert!(config.clock.flag_threshold < config.clock.persist_threshold);
    }
}
