use super::BoundingBox;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

pub const ALL_KINDS: &[ElementKind] = &[ElementKind::Node, ElementKind::Way, ElementKind::Relation];
pub const NODE_AND_WAY: &[ElementKind] = &[ElementKind::Node, ElementKind::Way];
pub const WAY_AND_RELATION: &[ElementKind] = &[ElementKind::Way, ElementKind::Relation];
pub const WAY_ONLY: &[ElementKind] = &[ElementKind::Way];

/// One tag predicate of a category query: a key, an optional value, and the
/// element kinds the statement is emitted for. The area templates restrict
/// some predicates (e.g. forests make no sense as nodes).
#[derive(Clone, Debug)]
pub struct TagPattern {
    pub key: String,
    pub value: Option<String>,
    pub kinds: &'static [ElementKind],
}

impl TagPattern {
    pub fn tag(key: &str, value: &str) -> Self {
        TagPattern {
            key: key.to_string(),
            value: Some(value.to_string()),
            kinds: ALL_KINDS,
        }
    }

    pub fn key(key: &str) -> Self {
        TagPattern {
            key: key.to_string(),
            value: None,
            kinds: ALL_KINDS,
        }
    }

    pub fn only(mut self, kinds: &'static [ElementKind]) -> Self {
        self.kinds = kinds;
        self
    }

    /// Parse an ad hoc `"key=value"` or bare `"key"` spec. Applies to all
    /// element kinds; malformed input never fails, the spec is taken as a
    /// bare key.
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('=') {
            Some((key, value)) => TagPattern::tag(key.trim(), value.trim()),
            None => TagPattern::key(spec.trim()),
        }
    }

    fn selector(&self) -> String {
        match &self.value {
            Some(value) => format!("[\"{}\"=\"{}\"]", self.key, value),
            None => format!("[\"{}\"]", self.key),
        }
    }
}

/// Build the query for every element matching `patterns` inside the named
/// administrative area. The trailing recursion (`>`) returns the nodes
/// referenced by matching ways so their geometry is resolvable downstream.
pub fn area_query(region_name: &str, admin_level: &str, patterns: &[TagPattern]) -> String {
    let mut query = String::from("[out:json];\n");
    query.push_str(&format!(
        "area[\"name\"=\"{}\"][\"admin_level\"=\"{}\"]->.searchArea;\n(\n",
        region_name, admin_level
    ));
    for pattern in patterns {
        for kind in pattern.kinds {
            query.push_str(&format!(
                "  {}{}(area.searchArea);\n",
                kind.as_str(),
                pattern.selector()
            ));
        }
    }
    query.push_str(");\nout body;\n>;\nout skel qt;\n");
    query
}

/// Build the query for every element matching `patterns` inside a bounding
/// box, for categories without an administrative-area template.
pub fn bbox_query(patterns: &[TagPattern], bbox: &BoundingBox) -> String {
    let coords = format!("{},{},{},{}", bbox.south, bbox.west, bbox.north, bbox.east);
    let mut query = String::from("[out:json];\n(\n");
    for pattern in patterns {
        for kind in pattern.kinds {
            query.push_str(&format!(
                "  {}{}({});\n",
                kind.as_str(),
                pattern.selector(),
                coords
            ));
        }
    }
    query.push_str(");\nout body;\n>;\nout skel qt;\n");
    query
}

/// Cache key for an ad hoc bounding-box query, derived from its tag specs.
pub fn bbox_query_type(specs: &[String]) -> String {
    format!("bbox_{}", specs.join("-").replace('=', "_"))
}
