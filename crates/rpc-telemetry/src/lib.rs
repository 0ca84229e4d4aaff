//! # RPC Telemetry
//!
//! Structured logging bootstrap for services built on `rpc-correlation`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rpc_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> Result<(), rpc_telemetry::TelemetryError> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // Log lines from the correlation core are now emitted
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `rpc-correlation` | Service name in logs |
//! | `RPC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RPC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `RPC_JSON_LOGS` | `false` | JSON lines instead of pretty output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}
