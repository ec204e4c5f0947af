//! CoRE link-format parsing for registration payloads.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// One resource entry from a registration payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub path: String,
    pub resource_type: Option<String>,
    pub interface: Option<String>,
}

impl ResourceLink {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            resource_type: None,
            interface: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkFormatError {
    MissingPathAnchor(String),
}

impl Display for LinkFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LinkFormatError::MissingPathAnchor(entry) => {
                write!(f, "link entry has no </path> anchor: {entry}")
            }
        }
    }
}

impl Error for LinkFormatError {}

/// Parses a registration payload such as
/// `</readings/temp>;rt="temperature";if="sensor",</hum>` into resource links.
///
/// Recognized attributes are `rt` (resource type) and `if` (interface
/// descriptor); anything else is ignored. Empty payloads yield an empty list.
pub fn parse_links(payload: &str) -> Result<Vec<ResourceLink>, LinkFormatError> {
    let mut links = Vec::new();

    for entry in payload.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let mut segments = entry.split(';');
        let anchor = segments.next().unwrap_or_default().trim();
        let path = anchor
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .filter(|path| path.starts_with('/'))
            .ok_or_else(|| LinkFormatError::MissingPathAnchor(entry.to_string()))?;

        let mut link = ResourceLink::new(path);
        for attribute in segments {
            let mut parts = attribute.splitn(2, '=');
            let name = parts.next().unwrap_or_default().trim();
            let value = parts
                .next()
                .map(|value| value.trim().trim_matches('"').to_string());

            match (name, value) {
                ("rt", Some(value)) => link.resource_type = Some(value),
                ("if", Some(value)) => link.interface = Some(value),
                _ => {}
            }
        }

        links.push(link);
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::{parse_links, LinkFormatError, ResourceLink};

    #[test]
    fn parses_paths_with_attributes() {
        let links = parse_links("</readings/temp>;rt=\"temperature\";if=\"sensor\",</hum>")
            .expect("valid payload");

        assert_eq!(
            links,
            vec![
                ResourceLink {
                    path: "/readings/temp".to_string(),
                    resource_type: Some("temperature".to_string()),
                    interface: Some("sensor".to_string()),
                },
                ResourceLink::new("/hum"),
            ]
        );
    }

    #[test]
    fn ignores_unknown_attributes() {
        let links = parse_links("</temp>;rt=\"temperature\";obs;sz=64").expect("valid payload");

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].resource_type.as_deref(), Some("temperature"));
        assert_eq!(links[0].interface, None);
    }

    #[test]
    fn empty_payload_yields_no_links() {
        assert_eq!(parse_links("").expect("empty payload"), Vec::new());
    }

    #[test]
    fn rejects_entries_without_path_anchor() {
        let err = parse_links("rt=\"temperature\"").expect_err("missing anchor");
        assert!(matches!(err, LinkFormatError::MissingPathAnchor(_)));
    }

    #[test]
    fn resource_links_serialize_for_the_exposure_boundary() {
        let link = ResourceLink {
            path: "/temp".to_string(),
            resource_type: Some("temperature".to_string()),
            interface: None,
        };

        let json = serde_json::to_string(&link).expect("serializable link");
        let round_tripped: ResourceLink = serde_json::from_str(&json).expect("deserializable link");
        assert_eq!(round_tripped, link);
    }
}
