//! Cross-component scenarios.

pub mod properties;
pub mod races;
pub mod teardown;
pub mod timeouts;
