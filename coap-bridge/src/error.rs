//! Error taxonomy surfaced by the mediation core.

use bridge_message::ResponseCode;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Typed outcomes for expected failure conditions.
///
/// None of these represent internal invariant violations; callers translate
/// them into protocol-appropriate response codes via [`BridgeError::response_code`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeError {
    /// Malformed or missing required registration fields.
    BadRequest(String),
    /// Unknown resource or node on resolve, subscribe or call.
    NotFound(String),
    /// No upstream response within the call deadline.
    UpstreamTimeout,
    /// Transport-level failure distinct from a timeout.
    UpstreamError(String),
    /// The node rejected an observe request.
    NotObservable(String),
}

impl BridgeError {
    /// Maps the error to the response code shown to bus-side callers.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            BridgeError::BadRequest(_) => ResponseCode::BadRequest,
            BridgeError::NotFound(_) => ResponseCode::NotFound,
            BridgeError::UpstreamTimeout => ResponseCode::GatewayTimeout,
            BridgeError::UpstreamError(_) => ResponseCode::InternalServerError,
            BridgeError::NotObservable(_) => ResponseCode::NotImplemented,
        }
    }
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::BadRequest(detail) => write!(f, "bad request: {detail}"),
            BridgeError::NotFound(detail) => write!(f, "not found: {detail}"),
            BridgeError::UpstreamTimeout => write!(f, "no upstream response within the deadline"),
            BridgeError::UpstreamError(detail) => write!(f, "upstream transport failure: {detail}"),
            BridgeError::NotObservable(path) => write!(f, "resource is not observable: {path}"),
        }
    }
}

impl Error for BridgeError {}
