//! Correlation configuration with validation.

use super::error::ConfigError;
use super::record::millis;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default per-call timeout: 30 seconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Default sweep interval: 1 second.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;

/// Timing configuration for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// How long a call may stay pending before the sweeper fails it.
    pub call_timeout_ms: u64,
    /// How often the sweeper scans the table.
    pub sweep_interval_ms: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl CorrelationConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RPC_CALL_TIMEOUT_MS`: Per-call timeout (default: 30000)
    /// - `RPC_SWEEP_INTERVAL_MS`: Sweep interval (default: 1000)
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            call_timeout_ms: env::var("RPC_CALL_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CALL_TIMEOUT_MS),

            sweep_interval_ms: env::var("RPC_SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "call_timeout_ms cannot be 0".into(),
            ));
        }

        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval(
                "sweep_interval_ms cannot be 0".into(),
            ));
        }

        if self.sweep_interval_ms > self.call_timeout_ms {
            return Err(ConfigError::InvalidInterval(format!(
                "sweep_interval_ms ({}) exceeds call_timeout_ms ({})",
                self.sweep_interval_ms, self.call_timeout_ms
            )));
        }

        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = millis(timeout);
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = millis(interval);
        self
    }
}
