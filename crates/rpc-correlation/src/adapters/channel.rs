//! In-memory transport over tokio channels.
//!
//! Suitable for single-process wiring and tests; a network deployment
//! would implement the same ports over sockets.

use crate::domain::TransportError;
use crate::ports::{InboundResponse, OutboundRequest, RequestTransport, ResponseSource};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

/// Sends requests into an mpsc channel.
pub struct ChannelTransport<Req> {
    sender: mpsc::Sender<OutboundRequest<Req>>,
}

impl<Req> ChannelTransport<Req> {
    /// Create the transport and the receiver the "remote" side reads from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundRequest<Req>>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl<Req> Clone for ChannelTransport<Req> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

#[async_trait]
impl<Req: Send + Sync + 'static> RequestTransport<Req> for ChannelTransport<Req> {
    async fn send(&self, request: OutboundRequest<Req>) -> Result<(), TransportError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Receives responses from an mpsc channel.
pub struct ChannelResponseSource<Resp> {
    receiver: Mutex<mpsc::Receiver<InboundResponse<Resp>>>,
}

impl<Resp> ChannelResponseSource<Resp> {
    /// Create the source and the sender the "remote" side writes to.
    pub fn new(capacity: usize) -> (mpsc::Sender<InboundResponse<Resp>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            sender,
            Self {
                receiver: Mutex::new(receiver),
            },
        )
    }
}

#[async_trait]
impl<Resp: Send + 'static> ResponseSource<Resp> for ChannelResponseSource<Resp> {
    async fn receive(&self) -> Result<InboundResponse<Resp>, TransportError> {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::ChannelClosed)
    }
}
