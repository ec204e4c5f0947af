//! CoAP method and response-code registry subset used by the bridge.

use std::fmt;
use std::fmt::{Display, Formatter};

/// Request methods the bridge forwards toward constrained-network nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns `true` for side-effect-free methods that may be served from cache.
    pub fn is_safe(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// CoAP response codes, carrying the protocol's numeric values.
///
/// Success codes occupy 64..96, client errors 128..160, server errors 160..192.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    Created = 65,
    Deleted = 66,
    Valid = 67,
    Changed = 68,
    Content = 69,
    Continue = 95,
    BadRequest = 128,
    Unauthorized = 129,
    BadOption = 130,
    Forbidden = 131,
    NotFound = 132,
    MethodNotAllowed = 133,
    NotAcceptable = 134,
    PreconditionFailed = 140,
    RequestEntityTooLarge = 141,
    UnsupportedContentFormat = 143,
    InternalServerError = 160,
    NotImplemented = 161,
    BadGateway = 162,
    ServiceUnavailable = 163,
    GatewayTimeout = 164,
    ProxyNotSupported = 165,
}

impl ResponseCode {
    /// Returns the raw protocol value of this code.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Returns `true` when the code belongs to the success class.
    pub fn is_success(self) -> bool {
        (64..96).contains(&(self as u8))
    }

    /// Converts a raw protocol value to a response code.
    pub fn from_value(value: u8) -> Option<ResponseCode> {
        match value {
            65 => Some(ResponseCode::Created),
            66 => Some(ResponseCode::Deleted),
            67 => Some(ResponseCode::Valid),
            68 => Some(ResponseCode::Changed),
            69 => Some(ResponseCode::Content),
            95 => Some(ResponseCode::Continue),
            128 => Some(ResponseCode::BadRequest),
            129 => Some(ResponseCode::Unauthorized),
            130 => Some(ResponseCode::BadOption),
            131 => Some(ResponseCode::Forbidden),
            132 => Some(ResponseCode::NotFound),
            133 => Some(ResponseCode::MethodNotAllowed),
            134 => Some(ResponseCode::NotAcceptable),
            140 => Some(ResponseCode::PreconditionFailed),
            141 => Some(ResponseCode::RequestEntityTooLarge),
            143 => Some(ResponseCode::UnsupportedContentFormat),
            160 => Some(ResponseCode::InternalServerError),
            161 => Some(ResponseCode::NotImplemented),
            162 => Some(ResponseCode::BadGateway),
            163 => Some(ResponseCode::ServiceUnavailable),
            164 => Some(ResponseCode::GatewayTimeout),
            165 => Some(ResponseCode::ProxyNotSupported),
            _ => None,
        }
    }
}

impl Display for ResponseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let value = self.value();
        write!(f, "{}.{:02}", value >> 5, value & 0x1F)
    }
}
