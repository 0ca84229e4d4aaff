//! # RPC Correlation Test Suite
//!
//! Integration scenarios exercising the correlation core end to end.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── loopback.rs    # Echo server over in-memory channels
//!     ├── races.rs       # Response vs cancel vs timeout
//!     ├── timeouts.rs    # Sweeper behavior
//!     ├── teardown.rs    # Session close and drop
//!     └── properties.rs  # Random operation sequences
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rpc-tests
//!
//! # By category
//! cargo test -p rpc-tests integration::races
//!
//! # Benchmarks
//! cargo bench -p rpc-tests
//! ```

pub mod integration;
