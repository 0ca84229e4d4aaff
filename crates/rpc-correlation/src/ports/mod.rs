//! Ports: traits at the boundary between the core and its collaborators.

pub mod outbound;

pub use outbound::{
    InboundResponse, ManualClock, MonotonicClock, OutboundRequest, RequestTransport,
    ResponseSource, TimeSource,
};
