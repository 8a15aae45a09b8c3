pub mod client;
pub mod query;

pub use client::{OverpassClient, OverpassError};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// South/west/north/east envelope, the coordinate order Overpass expects.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// One element of the Overpass response graph. Relations are parsed so the
/// payload deserializes, but their member geometry is never reconstructed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        tags: Option<HashMap<String, String>>,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        tags: Option<HashMap<String, String>>,
    },
    Relation {
        id: i64,
        tags: Option<HashMap<String, String>>,
    },
}

/// Pull the element list out of a raw payload. A payload without an
/// `elements` array yields an empty list, and individual elements that do
/// not deserialize are skipped rather than failing the whole response.
pub fn parse_elements(payload: &serde_json::Value) -> Vec<RawElement> {
    match payload.get("elements").and_then(|e| e.as_array()) {
        Some(elements) => elements
            .iter()
            .filter_map(|el| serde_json::from_value(el.clone()).ok())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_elements_missing_list() {
        assert!(parse_elements(&json!({})).is_empty());
        assert!(parse_elements(&json!({"elements": []})).is_empty());
        assert!(parse_elements(&json!({"elements": 42})).is_empty());
    }

    #[test]
    fn test_parse_elements_skips_malformed() {
        let payload = json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 38.5, "lon": -8.8},
                {"type": "node", "id": 2},
                {"type": "teapot", "id": 3}
            ]
        });
        let elements = parse_elements(&payload);
        assert_eq!(elements.len(), 1);
        assert!(matches!(elements[0], RawElement::Node { id: 1, .. }));
    }
}
