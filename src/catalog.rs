use crate::filter::FilterRule;
use crate::overpass::query::{TagPattern, NODE_AND_WAY, WAY_AND_RELATION, WAY_ONLY};

/// How a category's elements are selected: against the administrative area
/// of the region, or against its bounding box (for tag sets that spill past
/// the municipal boundary, like the wineries).
#[derive(Clone, Debug)]
pub enum CategoryQuery {
    Area(Vec<TagPattern>),
    BoundingBox(Vec<TagPattern>),
}

/// One selectable map layer.
#[derive(Clone, Debug)]
pub struct FeatureCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub glyph: &'static str,
    pub query: CategoryQuery,
}

/// The immutable category and filter tables, built once at startup and
/// passed around as a dependency.
pub struct Catalog {
    pub categories: Vec<FeatureCategory>,
    pub filters: Vec<FilterRule>,
}

impl Catalog {
    pub fn palmela() -> Self {
        let categories = vec![
            FeatureCategory {
                id: "schools",
                name: "Escolas",
                glyph: "🏫",
                query: CategoryQuery::Area(vec![TagPattern::tag("amenity", "school")]),
            },
            FeatureCategory {
                id: "historical_sites",
                name: "Locais Históricos",
                glyph: "🏛️",
                query: CategoryQuery::Area(vec![
                    TagPattern::key("historic"),
                    TagPattern::tag("tourism", "museum").only(NODE_AND_WAY),
                    TagPattern::key("heritage"),
                ]),
            },
            FeatureCategory {
                id: "environmental_features",
                name: "Ambiente",
                glyph: "🌳",
                query: CategoryQuery::Area(vec![
                    TagPattern::tag("leisure", "park"),
                    TagPattern::tag("leisure", "nature_reserve"),
                    TagPattern::tag("landuse", "forest").only(WAY_AND_RELATION),
                    TagPattern::tag("natural", "water").only(WAY_AND_RELATION),
                ]),
            },
            FeatureCategory {
                id: "urban_elements",
                name: "Elementos Urbanos",
                glyph: "🏙️",
                query: CategoryQuery::Area(vec![
                    TagPattern::key("landuse").only(WAY_AND_RELATION),
                    TagPattern::key("building").only(WAY_ONLY),
                    TagPattern::key("highway").only(WAY_ONLY),
                ]),
            },
            FeatureCategory {
                id: "wineries",
                name: "Adegas",
                glyph: "🍷",
                query: CategoryQuery::BoundingBox(vec![
                    TagPattern::tag("craft", "winery"),
                    TagPattern::tag("amenity", "winery"),
                ]),
            },
        ];

        let filters = vec![
            FilterRule {
                id: "public_schools",
                category_id: "schools",
                label: "Escolas Públicas",
                key: "operator:type",
                value: "public,government",
            },
            FilterRule {
                id: "private_schools",
                category_id: "schools",
                label: "Escolas Privadas",
                key: "operator:type",
                value: "private",
            },
            FilterRule {
                id: "castles",
                category_id: "historical_sites",
                label: "Castelos e Fortes",
                key: "historic",
                value: "castle,fort",
            },
            FilterRule {
                id: "ruins",
                category_id: "historical_sites",
                label: "Ruínas e Sítios Arqueológicos",
                key: "historic",
                value: "ruins,archaeological_site",
            },
            FilterRule {
                id: "monuments",
                category_id: "historical_sites",
                label: "Monumentos e Memoriais",
                key: "historic",
                value: "monument,memorial",
            },
            FilterRule {
                id: "museums",
                category_id: "historical_sites",
                label: "Museus",
                key: "tourism",
                value: "museum",
            },
            FilterRule {
                id: "parks",
                category_id: "environmental_features",
                label: "Parques e Jardins",
                key: "leisure",
                value: "park,garden",
            },
            FilterRule {
                id: "nature_reserves",
                category_id: "environmental_features",
                label: "Reservas Naturais",
                key: "leisure",
                value: "nature_reserve",
            },
            FilterRule {
                id: "forests",
                category_id: "environmental_features",
                label: "Florestas",
                key: "landuse",
                value: "forest",
            },
            FilterRule {
                id: "water",
                category_id: "environmental_features",
                label: "Água",
                key: "natural",
                value: "water",
            },
            FilterRule {
                id: "residential",
                category_id: "urban_elements",
                label: "Zonas Residenciais",
                key: "landuse",
                value: "residential",
            },
            FilterRule {
                id: "industrial",
                category_id: "urban_elements",
                label: "Zonas Industriais",
                key: "landuse",
                value: "industrial",
            },
            FilterRule {
                id: "commercial",
                category_id: "urban_elements",
                label: "Comércio",
                key: "landuse",
                value: "commercial,retail",
            },
            FilterRule {
                id: "main_roads",
                category_id: "urban_elements",
                label: "Vias Principais",
                key: "highway",
                value: "primary,secondary,tertiary",
            },
            FilterRule {
                id: "wine_producers",
                category_id: "wineries",
                label: "Produtores",
                key: "craft",
                value: "winery",
            },
            FilterRule {
                id: "wine_venues",
                category_id: "wineries",
                label: "Enoturismo",
                key: "amenity",
                value: "winery",
            },
        ];

        Self { categories, filters }
    }

    pub fn category(&self, id: &str) -> Option<&FeatureCategory> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn filters_for(&self, category_id: &str) -> Vec<FilterRule> {
        self.filters
            .iter()
            .filter(|rule| rule.category_id == category_id)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_lookup() {
        let catalog = Catalog::palmela();
        assert!(catalog.category("schools").is_some());
        assert!(catalog.category("wineries").is_some());
        assert!(catalog.category("nightlife").is_none());
    }

    #[test]
    fn test_every_filter_belongs_to_a_category() {
        let catalog = Catalog::palmela();
        for rule in &catalog.filters {
            assert!(
                catalog.category(rule.category_id).is_some(),
                "filter {} references unknown category {}",
                rule.id,
                rule.category_id
            );
        }
    }

    #[test]
    fn test_filter_ids_are_unique() {
        let catalog = Catalog::palmela();
        let mut ids: Vec<_> = catalog.filters.iter().map(|rule| rule.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.filters.len());
    }

    #[test]
    fn test_wineries_query_by_bounding_box() {
        let catalog = Catalog::palmela();
        let wineries = catalog.category("wineries").unwrap();
        assert!(matches!(wineries.query, CategoryQuery::BoundingBox(_)));

        let schools = catalog.category("schools").unwrap();
        assert!(matches!(schools.query, CategoryQuery::Area(_)));
    }
}
