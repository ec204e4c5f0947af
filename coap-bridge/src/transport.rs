//! Upstream transport boundary toward constrained-network nodes.

use async_trait::async_trait;
use bridge_message::{RequestMessage, ResponseMessage};
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc::Receiver;

/// Transport-level failures, distinct from protocol-level error responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The node could not be reached at all.
    Unreachable(String),
    /// An exchange was interrupted mid-flight.
    Interrupted(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unreachable(detail) => write!(f, "node unreachable: {detail}"),
            TransportError::Interrupted(detail) => write!(f, "exchange interrupted: {detail}"),
        }
    }
}

impl Error for TransportError {}

/// An accepted upstream observation: the node's initial response plus the
/// channel on which subsequent notifications arrive.
pub struct ObserveHandle {
    pub initial: ResponseMessage,
    pub notifications: Receiver<ResponseMessage>,
}

/// The constrained-network protocol stack, as consumed by the core.
///
/// Wire-level framing and session handling live behind this trait; the core
/// only addresses nodes by their registered context string.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Performs one request/response exchange with the node at `context`.
    async fn send_request(
        &self,
        context: &str,
        request: RequestMessage,
    ) -> Result<ResponseMessage, TransportError>;

    /// Issues an observe-register request and returns the notification stream.
    async fn observe(
        &self,
        context: &str,
        request: RequestMessage,
    ) -> Result<ObserveHandle, TransportError>;

    /// Issues an observe-deregister request for a previously observed resource.
    async fn cancel_observe(
        &self,
        context: &str,
        request: RequestMessage,
    ) -> Result<ResponseMessage, TransportError>;
}
