use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value as GeoValue};
use serde_json::Value;
use std::collections::HashMap;

use crate::overpass::{parse_elements, RawElement};

/// Convert a raw Overpass payload into a GeoJSON FeatureCollection.
///
/// Two passes: the first indexes every node's coordinates by id, the second
/// emits tagged nodes as Points and tagged ways as Polygons or LineStrings.
/// Untagged elements are dropped (they are usually just shared vertices),
/// node references a way cannot resolve are skipped silently, and relations
/// produce no geometry (multipolygon reconstruction is a known gap). A
/// payload without an `elements` array converts to an empty collection.
pub fn convert(payload: &Value) -> FeatureCollection {
    let elements = parse_elements(payload);

    let mut node_coords: HashMap<i64, (f64, f64)> = HashMap::new();
    for element in &elements {
        if let RawElement::Node { id, lat, lon, .. } = element {
            node_coords.insert(*id, (*lon, *lat));
        }
    }

    let mut features = Vec::new();
    for element in &elements {
        match element {
            RawElement::Node { id, lat, lon, tags } => {
                let Some(tags) = tags else { continue };
                features.push(make_feature(
                    "node",
                    *id,
                    tags,
                    GeoValue::Point(vec![*lon, *lat]),
                ));
            }
            RawElement::Way { id, nodes, tags } => {
                let Some(tags) = tags else { continue };
                let coordinates: Vec<Vec<f64>> = nodes
                    .iter()
                    .filter_map(|node_id| node_coords.get(node_id))
                    .map(|(lon, lat)| vec![*lon, *lat])
                    .collect();
                if coordinates.is_empty() {
                    continue;
                }

                // Closed ways become polygons: more than 3 resolved
                // coordinates and identical first/last node references.
                let closed = coordinates.len() > 3 && nodes.first() == nodes.last();
                let geometry = if closed {
                    GeoValue::Polygon(vec![coordinates])
                } else {
                    GeoValue::LineString(coordinates)
                };
                features.push(make_feature("way", *id, tags, geometry));
            }
            RawElement::Relation { .. } => {}
        }
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn make_feature(
    osm_type: &str,
    osm_id: i64,
    tags: &HashMap<String, String>,
    geometry: GeoValue,
) -> Feature {
    let mut properties = JsonObject::new();
    for (key, value) in tags {
        properties.insert(key.clone(), JsonValue::String(value.clone()));
    }
    properties.insert("osm_type".to_string(), JsonValue::from(osm_type));
    properties.insert("osm_id".to_string(), JsonValue::from(osm_id));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: Some(Id::String(format!("{}/{}", osm_type, osm_id))),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// `[min_lon, min_lat, max_lon, max_lat]` envelope of a collection, used by
/// the render layer to fit the view. `None` for an empty collection.
pub fn feature_bounds(collection: &FeatureCollection) -> Option<[f64; 4]> {
    let mut bounds: Option<[f64; 4]> = None;
    for feature in &collection.features {
        if let Some(geometry) = &feature.geometry {
            accumulate(&geometry.value, &mut bounds);
        }
    }
    bounds
}

fn accumulate(value: &GeoValue, bounds: &mut Option<[f64; 4]>) {
    match value {
        GeoValue::Point(position) => extend(bounds, position),
        GeoValue::LineString(positions) => {
            for position in positions {
                extend(bounds, position);
            }
        }
        GeoValue::Polygon(rings) => {
            for ring in rings {
                for position in ring {
                    extend(bounds, position);
                }
            }
        }
        _ => {}
    }
}

fn extend(bounds: &mut Option<[f64; 4]>, position: &[f64]) {
    let (lon, lat) = (position[0], position[1]);
    match bounds {
        Some([min_lon, min_lat, max_lon, max_lat]) => {
            *min_lon = min_lon.min(lon);
            *min_lat = min_lat.min(lat);
            *max_lon = max_lon.max(lon);
            *max_lat = max_lat.max(lat);
        }
        None => *bounds = Some([lon, lat, lon, lat]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: i64, lat: f64, lon: f64) -> Value {
        json!({"type": "node", "id": id, "lat": lat, "lon": lon})
    }

    #[test]
    fn test_empty_payloads_convert_to_empty_collections() {
        assert!(convert(&json!({})).features.is_empty());
        assert!(convert(&json!({"elements": []})).features.is_empty());
        assert!(convert(&json!(null)).features.is_empty());
    }

    #[test]
    fn test_tagged_node_becomes_point() {
        let payload = json!({
            "elements": [
                {"type": "node", "id": 7, "lat": 38.57, "lon": -8.8,
                 "tags": {"amenity": "school", "name": "Escola Secundária"}}
            ]
        });
        let collection = convert(&payload);

        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.id, Some(Id::String("node/7".to_string())));

        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties["amenity"], json!("school"));
        assert_eq!(properties["osm_type"], json!("node"));
        assert_eq!(properties["osm_id"], json!(7));

        match &feature.geometry.as_ref().unwrap().value {
            GeoValue::Point(position) => assert_eq!(position, &vec![-8.8, 38.57]),
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn test_untagged_nodes_are_dropped() {
        let payload = json!({"elements": [node(1, 38.5, -8.8), node(2, 38.6, -8.9)]});
        assert!(convert(&payload).features.is_empty());
    }

    #[test]
    fn test_closed_way_becomes_polygon() {
        let payload = json!({
            "elements": [
                node(1, 0.0, 0.0), node(2, 0.0, 1.0), node(3, 1.0, 1.0),
                {"type": "way", "id": 10, "nodes": [1, 2, 3, 1],
                 "tags": {"leisure": "park"}}
            ]
        });
        let collection = convert(&payload);

        assert_eq!(collection.features.len(), 1);
        match &collection.features[0].geometry.as_ref().unwrap().value {
            GeoValue::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[0].first(), rings[0].last());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_open_way_becomes_linestring() {
        let payload = json!({
            "elements": [
                node(1, 0.0, 0.0), node(2, 0.0, 1.0), node(3, 1.0, 1.0),
                {"type": "way", "id": 10, "nodes": [1, 2, 3],
                 "tags": {"highway": "residential"}}
            ]
        });
        let collection = convert(&payload);

        match &collection.features[0].geometry.as_ref().unwrap().value {
            GeoValue::LineString(positions) => assert_eq!(positions.len(), 3),
            other => panic!("expected linestring, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolvable_node_refs_are_skipped() {
        let payload = json!({
            "elements": [
                node(1, 0.0, 0.0), node(2, 0.0, 1.0),
                {"type": "way", "id": 10, "nodes": [1, 99, 2],
                 "tags": {"highway": "track"}},
                {"type": "way", "id": 11, "nodes": [97, 98, 99],
                 "tags": {"highway": "path"}}
            ]
        });
        let collection = convert(&payload);

        // Way 11 resolves nothing at all and is dropped entirely.
        assert_eq!(collection.features.len(), 1);
        match &collection.features[0].geometry.as_ref().unwrap().value {
            GeoValue::LineString(positions) => assert_eq!(positions.len(), 2),
            other => panic!("expected linestring, got {:?}", other),
        }
    }

    #[test]
    fn test_relations_produce_no_geometry() {
        let payload = json!({
            "elements": [
                {"type": "relation", "id": 5, "tags": {"type": "multipolygon", "landuse": "forest"}}
            ]
        });
        assert!(convert(&payload).features.is_empty());
    }

    #[test]
    fn test_feature_bounds_envelope() {
        let payload = json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 38.54, "lon": -8.92, "tags": {"amenity": "school"}},
                {"type": "node", "id": 2, "lat": 38.64, "lon": -8.58, "tags": {"amenity": "school"}}
            ]
        });
        let collection = convert(&payload);
        assert_eq!(feature_bounds(&collection), Some([-8.92, 38.54, -8.58, 38.64]));

        let empty = convert(&json!({}));
        assert_eq!(feature_bounds(&empty), None);
    }
}
