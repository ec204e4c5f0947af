//! Exposure-manager boundary: how the core surfaces resources to the bus side.

use async_trait::async_trait;
use bridge_message::ResponseMessage;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Failure to deliver a notification to one bus-side subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryError(pub String);

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl Error for DeliveryError {}

/// The bus-side object manager, as consumed by the core.
///
/// The registry drives `on_resource_added`/`on_resource_removed` as its
/// resource set changes; the observation multiplexer drives `notify` for each
/// current subscriber when an upstream notification arrives.
#[async_trait]
pub trait ExposureSink: Send + Sync {
    async fn on_resource_added(
        &self,
        path: &str,
        resource_type: Option<&str>,
        interface: Option<&str>,
    );

    async fn on_resource_removed(&self, path: &str);

    /// Delivers one notification to one subscriber; failures are isolated per
    /// subscriber by the caller.
    async fn notify(
        &self,
        subscriber: &str,
        path: &str,
        response: &ResponseMessage,
    ) -> Result<(), DeliveryError>;
}
