//! Concrete representation (content-format) types known to the bridge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// The concrete media types a cached representation can carry.
///
/// A request with no accept criteria denotes the whole family; key derivation
/// then probes [`MediaType::ALL`] in its fixed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    TextPlain,
    LinkFormat,
    Xml,
    OctetStream,
    Exi,
    Json,
    Cbor,
}

impl MediaType {
    /// Every known concrete media type, in the deterministic probe order used
    /// for wildcard-accept cache lookups.
    pub const ALL: [MediaType; 7] = [
        MediaType::TextPlain,
        MediaType::LinkFormat,
        MediaType::Xml,
        MediaType::OctetStream,
        MediaType::Exi,
        MediaType::Json,
        MediaType::Cbor,
    ];

    /// Returns the CoAP content-format registry number.
    pub fn numeric(self) -> u16 {
        match self {
            MediaType::TextPlain => 0,
            MediaType::LinkFormat => 40,
            MediaType::Xml => 41,
            MediaType::OctetStream => 42,
            MediaType::Exi => 47,
            MediaType::Json => 50,
            MediaType::Cbor => 60,
        }
    }

    /// Converts a content-format registry number to a media type.
    pub fn from_numeric(value: u16) -> Option<MediaType> {
        MediaType::ALL.into_iter().find(|m| m.numeric() == value)
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::TextPlain => write!(f, "text/plain"),
            MediaType::LinkFormat => write!(f, "application/link-format"),
            MediaType::Xml => write!(f, "application/xml"),
            MediaType::OctetStream => write!(f, "application/octet-stream"),
            MediaType::Exi => write!(f, "application/exi"),
            MediaType::Json => write!(f, "application/json"),
            MediaType::Cbor => write!(f, "application/cbor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MediaType;

    #[test]
    fn numeric_values_round_trip() {
        for media_type in MediaType::ALL {
            assert_eq!(MediaType::from_numeric(media_type.numeric()), Some(media_type));
        }
        assert_eq!(MediaType::from_numeric(9999), None);
    }

    #[test]
    fn probe_order_is_stable() {
        assert_eq!(MediaType::ALL[0], MediaType::TextPlain);
        assert_eq!(MediaType::ALL.len(), 7);
    }
}
