use geojson::{FeatureCollection, JsonObject, JsonValue};
use serde::Serialize;

/// Marker appearance handed to the render layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeatureStyle {
    pub glyph: &'static str,
    pub color: &'static str,
}

/// Predicate over a feature's tag set.
#[derive(Clone, Debug)]
pub enum TagPredicate {
    KeyEquals(&'static str, &'static str),
    KeyPresent(&'static str),
}

impl TagPredicate {
    fn matches(&self, properties: &JsonObject) -> bool {
        match self {
            TagPredicate::KeyEquals(key, value) => {
                properties.get(*key).and_then(|v| v.as_str()) == Some(*value)
            }
            TagPredicate::KeyPresent(key) => properties
                .get(*key)
                .and_then(|v| v.as_str())
                .is_some_and(|v| !v.is_empty()),
        }
    }
}

/// Ordered rule table mapping tag sets to styles. Rules are evaluated top
/// to bottom and the first match wins, so a feature carrying several
/// style-relevant tags (`amenity=winery` plus `craft=winery`) always
/// resolves to the same style. Reorder deliberately, never casually.
pub struct FeatureClassifier {
    rules: Vec<(TagPredicate, FeatureStyle)>,
    default_style: FeatureStyle,
}

const DEFAULT_STYLE: FeatureStyle = FeatureStyle {
    glyph: "📍",
    color: "#3388ff",
};

impl FeatureClassifier {
    /// The styling table of the Palmela map: education red, heritage brown,
    /// green spaces green, water blue, wine dark red, points of interest
    /// orange, built fabric grey.
    pub fn palmela() -> Self {
        use TagPredicate::{KeyEquals, KeyPresent};

        let rules = vec![
            (KeyEquals("amenity", "school"), style("🏫", "#ff0000")),
            (KeyEquals("amenity", "college"), style("🎓", "#ff0000")),
            (KeyEquals("amenity", "university"), style("🎓", "#ff0000")),
            (KeyEquals("amenity", "library"), style("📚", "#995500")),
            (KeyEquals("amenity", "museum"), style("🏛️", "#995500")),
            (KeyEquals("amenity", "restaurant"), style("🍽️", "#ff7800")),
            (KeyEquals("amenity", "cafe"), style("☕", "#ff7800")),
            (KeyEquals("amenity", "bar"), style("🍺", "#ff7800")),
            (KeyEquals("amenity", "winery"), style("🍷", "#722F37")),
            (KeyEquals("tourism", "hotel"), style("🏨", "#ff7800")),
            (KeyEquals("tourism", "guest_house"), style("🏠", "#ff7800")),
            (KeyEquals("tourism", "hostel"), style("🛏️", "#ff7800")),
            (KeyEquals("tourism", "information"), style("ℹ️", "#ff7800")),
            (KeyEquals("tourism", "viewpoint"), style("🔭", "#ff7800")),
            (KeyEquals("tourism", "picnic_site"), style("🧺", "#ff7800")),
            (KeyEquals("tourism", "museum"), style("🏛️", "#995500")),
            (KeyEquals("tourism", "camp_site"), style("⛺", "#ff7800")),
            // Specific historic values sit above the generic presence rule;
            // every other historic value styles uniformly as heritage
            // (there is no per-value icon lookup beyond these five).
            (KeyEquals("historic", "castle"), style("🏰", "#995500")),
            (KeyEquals("historic", "ruins"), style("🏚️", "#995500")),
            (KeyEquals("historic", "monument"), style("🗿", "#995500")),
            (KeyEquals("historic", "memorial"), style("🪦", "#995500")),
            (
                KeyEquals("historic", "archaeological_site"),
                style("🏺", "#995500"),
            ),
            (KeyPresent("historic"), style("🏛️", "#995500")),
            (KeyEquals("leisure", "park"), style("🌳", "#00aa00")),
            (KeyEquals("leisure", "garden"), style("🌷", "#00aa00")),
            (KeyEquals("leisure", "nature_reserve"), style("🌿", "#00aa00")),
            (KeyEquals("natural", "water"), style("💧", "#0099ff")),
            (KeyEquals("water", "river"), style("🏞️", "#0099ff")),
            (KeyEquals("water", "lake"), style("🏞️", "#0099ff")),
            (KeyEquals("water", "reservoir"), style("💦", "#0099ff")),
            (KeyEquals("craft", "winery"), style("🍷", "#722F37")),
            (KeyEquals("landuse", "vineyard"), style("🍇", "#722F37")),
            (KeyEquals("landuse", "forest"), style("🌲", "#00aa00")),
            (KeyEquals("building", "yes"), style("🏢", "#999999")),
            (KeyEquals("building", "residential"), style("🏘️", "#999999")),
            (KeyEquals("building", "commercial"), style("🏬", "#999999")),
            (KeyEquals("building", "industrial"), style("🏭", "#999999")),
        ];

        Self {
            rules,
            default_style: DEFAULT_STYLE,
        }
    }

    pub fn classify(&self, properties: &JsonObject) -> &FeatureStyle {
        self.rules
            .iter()
            .find(|(predicate, _)| predicate.matches(properties))
            .map(|(_, style)| style)
            .unwrap_or(&self.default_style)
    }

    /// Write `marker_glyph` / `marker_color` into every feature's
    /// properties so the render layer styles without re-deriving.
    pub fn attach_styles(&self, collection: &mut FeatureCollection) {
        for feature in &mut collection.features {
            let style = match &feature.properties {
                Some(properties) => self.classify(properties).clone(),
                None => self.default_style.clone(),
            };
            let properties = feature.properties.get_or_insert_with(JsonObject::new);
            properties.insert("marker_glyph".to_string(), JsonValue::from(style.glyph));
            properties.insert("marker_color".to_string(), JsonValue::from(style.color));
        }
    }
}

fn style(glyph: &'static str, color: &'static str) -> FeatureStyle {
    FeatureStyle { glyph, color }
}
