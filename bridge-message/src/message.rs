//! Request and response messages exchanged with constrained-network nodes.

use crate::{MediaType, Method, ResponseCode};
use tokio::time::Instant;

/// An outbound request toward a constrained-network node.
///
/// The `authority` field is filled by the dispatcher once the owning node's
/// context has been resolved; callers address resources by registry path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestMessage {
    pub method: Method,
    pub authority: String,
    pub path: String,
    pub query: Option<String>,
    pub accept: Option<MediaType>,
    pub content_format: Option<MediaType>,
    pub payload: Vec<u8>,
    pub observe: Option<u32>,
}

impl RequestMessage {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            authority: String::new(),
            path: path.to_string(),
            query: None,
            accept: None,
            content_format: None,
            payload: Vec::new(),
            observe: None,
        }
    }

    /// Normalized target identity: authority + path + query.
    ///
    /// Composed from the typed fields, so it is stable regardless of the
    /// order options arrived in on the wire.
    pub fn target_identity(&self) -> String {
        let mut identity = String::new();
        identity.push_str(&self.authority.to_ascii_lowercase());
        if !self.path.starts_with('/') {
            identity.push('/');
        }
        identity.push_str(&self.path);
        if let Some(query) = &self.query {
            identity.push('?');
            identity.push_str(query);
        }
        identity
    }
}

/// A response received from a constrained-network node.
///
/// `max_age` is the declared freshness lifetime in seconds; `arrived_at` is
/// stamped by the dispatcher on receipt and consumed by the response cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseMessage {
    pub code: ResponseCode,
    pub content_format: Option<MediaType>,
    pub payload: Vec<u8>,
    pub max_age: Option<u64>,
    pub observe: Option<u32>,
    pub arrived_at: Option<Instant>,
}

impl ResponseMessage {
    pub fn new(code: ResponseCode) -> Self {
        Self {
            code,
            content_format: None,
            payload: Vec::new(),
            max_age: None,
            observe: None,
            arrived_at: None,
        }
    }

    pub fn with_payload(mut self, content_format: MediaType, payload: Vec<u8>) -> Self {
        self.content_format = Some(content_format);
        self.payload = payload;
        self
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}
