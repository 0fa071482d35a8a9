//! Bridge Message Protocol
//!
//! JSON messages exchanged between the host and the render surface. Each
//! direction has its own closed enum, discriminated on the wire by a `type`
//! field.
//!
//! | Direction      | `type`              | Fields         |
//! |----------------|---------------------|----------------|
//! | host → surface | `update`            | `uri`, `text`  |
//! | host → surface | `loadImageResponse` | `id`, `text`   |
//! | surface → host | `update`            | `map`          |
//! | surface → host | `loadImage`         | `id`, `uri`    |

use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::{DocumentSnapshot, Locator};

/// Correlation id pairing a `loadImage` request with its response.
///
/// Generated from a random v4 UUID, so ids are unpredictable and never
/// repeat within a surface's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Message sent by the host to the render surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    /// Full document replacement snapshot
    Update {
        /// Locator of the backing document
        uri: Locator,
        /// Complete document text
        text: String,
    },

    /// Inline-encoded resource answering a prior `loadImage`
    LoadImageResponse {
        id: RequestId,
        /// Data URI (e.g. `data:image/png;base64,...`)
        text: String,
    },
}

/// Message sent by the render surface to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceMessage {
    /// Edited document, serialized and written verbatim by the host
    Update { map: serde_json::Value },

    /// Request to resolve `uri` into resource bytes
    LoadImage { id: RequestId, uri: String },
}

impl HostMessage {
    /// Create an update message from a snapshot.
    pub fn update(snapshot: DocumentSnapshot) -> Self {
        Self::Update {
            uri: snapshot.locator,
            text: snapshot.text,
        }
    }

    /// Create a load response carrying an inline payload.
    pub fn load_image_response(id: RequestId, text: impl Into<String>) -> Self {
        Self::LoadImageResponse {
            id,
            text: text.into(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::LoadImageResponse { .. } => "loadImageResponse",
        }
    }
}

impl SurfaceMessage {
    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::LoadImage { .. } => "loadImage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_update_wire_shape() {
        let msg = HostMessage::update(DocumentSnapshot::new("doc://a", r#"{"scratches":[]}"#));
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "type": "update", "uri": "doc://a", "text": "{\"scratches\":[]}" })
        );
    }

    #[test]
    fn test_load_image_response_tag() {
        let msg = HostMessage::load_image_response(RequestId::from("r1"), "data:image/png;base64,AA==");
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"loadImageResponse""#));
        assert!(json.contains(r#""id":"r1""#));
    }

    #[test]
    fn test_surface_messages_parse() {
        let update = SurfaceMessage::from_json(r#"{"type":"update","map":{"scratches":[1]}}"#).unwrap();
        assert_eq!(
            update,
            SurfaceMessage::Update {
                map: json!({ "scratches": [1] })
            }
        );

        let load = SurfaceMessage::from_json(r#"{"type":"loadImage","id":"x","uri":"img://x"}"#).unwrap();
        match load {
            SurfaceMessage::LoadImage { id, uri } => {
                assert_eq!(id.as_str(), "x");
                assert_eq!(uri, "img://x");
            }
            other => panic!("expected loadImage, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(SurfaceMessage::from_json(r#"{"type":"delete","id":"1"}"#).is_err());
        assert!(HostMessage::from_json(r#"{"type":"update"}"#).is_err());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
