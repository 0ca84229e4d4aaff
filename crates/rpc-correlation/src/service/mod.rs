//! Service layer: session boundary, sweeper loop and response listener.

pub mod listener;
pub mod session;
pub mod sweeper;

pub use listener::ResponseListener;
pub use session::{PendingCall, RpcSession};
pub use sweeper::{SweeperHandle, TimeoutSweeper};
