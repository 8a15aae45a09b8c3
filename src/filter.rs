use geojson::{Feature, FeatureCollection};
use serde::Serialize;

/// A user-toggleable refinement of one category. `value` may carry several
/// comma-separated alternatives, any of which counts as a match.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FilterRule {
    pub id: &'static str,
    pub category_id: &'static str,
    pub label: &'static str,
    pub key: &'static str,
    pub value: &'static str,
}

impl FilterRule {
    pub fn matches(&self, feature: &Feature) -> bool {
        let Some(properties) = &feature.properties else {
            return false;
        };
        // A feature without the property never matches.
        let Some(actual) = properties.get(self.key).and_then(|v| v.as_str()) else {
            return false;
        };
        self.value.split(',').any(|alt| alt.trim() == actual)
    }
}

/// Keep the features matching at least one active rule. An empty active set
/// is a pass-through, not a rejection. Pure and idempotent: reapplying the
/// same arguments cannot change the result.
pub fn apply(
    collection: FeatureCollection,
    rules: &[FilterRule],
    active_ids: &[String],
) -> FeatureCollection {
    if active_ids.is_empty() {
        return collection;
    }

    let active: Vec<&FilterRule> = rules
        .iter()
        .filter(|rule| active_ids.iter().any(|id| id == rule.id))
        .collect();

    let features = collection
        .features
        .into_iter()
        .filter(|feature| active.iter().any(|rule| rule.matches(feature)))
        .collect();

    FeatureCollection {
        bbox: collection.bbox,
        features,
        foreign_members: collection.foreign_members,
    }
}
