use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    catalog::{Catalog, CategoryQuery},
    config::Config,
    filter,
    geometry,
    overpass::query::{self, TagPattern},
    overpass::{BoundingBox, OverpassClient},
    style::FeatureClassifier,
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub classifier: Arc<FeatureClassifier>,
    pub overpass: Arc<OverpassClient>,
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct FeaturesParams {
    pub filters: Option<String>,
    pub refresh: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BboxFeaturesParams {
    pub tags: String,
    pub bbox: Option<String>,
    pub refresh: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct FilterInfo {
    pub id: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub glyph: &'static str,
    pub filters: Vec<FilterInfo>,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub category: String,
    pub count: usize,
    pub bounds: Option<[f64; 4]>,
    pub collection: FeatureCollection,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<CategoryInfo>> {
    let categories = state
        .catalog
        .categories
        .iter()
        .map(|category| CategoryInfo {
            id: category.id,
            name: category.name,
            glyph: category.glyph,
            filters: state
                .catalog
                .filters_for(category.id)
                .into_iter()
                .map(|rule| FilterInfo {
                    id: rule.id,
                    label: rule.label,
                })
                .collect(),
        })
        .collect();
    Json(categories)
}

pub async fn category_features(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    Query(params): Query<FeaturesParams>,
) -> Result<Json<FeaturesResponse>, StatusCode> {
    let Some(category) = state.catalog.category(&category_id) else {
        return Err(StatusCode::NOT_FOUND);
    };

    let query_string = match &category.query {
        CategoryQuery::Area(patterns) => query::area_query(
            &state.config.region_name,
            &state.config.region_admin_level,
            patterns,
        ),
        CategoryQuery::BoundingBox(patterns) => {
            query::bbox_query(patterns, &state.config.region_bbox)
        }
    };

    let payload = state
        .overpass
        .fetch(&query_string, category.id, params.refresh.unwrap_or(false))
        .await
        .map_err(|e| {
            tracing::error!("Fetching {} data failed: {}", category.id, e);
            StatusCode::BAD_GATEWAY
        })?;

    let mut collection = geometry::convert(&payload);
    let rules = state.catalog.filters_for(category.id);
    collection = filter::apply(collection, &rules, &active_filter_ids(params.filters));
    state.classifier.attach_styles(&mut collection);

    Ok(Json(respond(category.id.to_string(), collection)))
}

pub async fn bbox_features(
    State(state): State<AppState>,
    Query(params): Query<BboxFeaturesParams>,
) -> Result<Json<FeaturesResponse>, StatusCode> {
    let specs: Vec<String> = params
        .tags
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if specs.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let bbox = match &params.bbox {
        Some(raw) => parse_bbox(raw).ok_or(StatusCode::BAD_REQUEST)?,
        None => state.config.region_bbox,
    };

    let patterns: Vec<TagPattern> = specs.iter().map(|spec| TagPattern::parse(spec)).collect();
    let query_string = query::bbox_query(&patterns, &bbox);
    let query_type = query::bbox_query_type(&specs);

    let payload = state
        .overpass
        .fetch(&query_string, &query_type, params.refresh.unwrap_or(false))
        .await
        .map_err(|e| {
            tracing::error!("Fetching {} data failed: {}", query_type, e);
            StatusCode::BAD_GATEWAY
        })?;

    let mut collection = geometry::convert(&payload);
    state.classifier.attach_styles(&mut collection);

    Ok(Json(respond(query_type, collection)))
}

fn respond(category: String, collection: FeatureCollection) -> FeaturesResponse {
    FeaturesResponse {
        category,
        count: collection.features.len(),
        bounds: geometry::feature_bounds(&collection),
        collection,
        generated_at: chrono::Utc::now(),
    }
}

fn active_filter_ids(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn parse_bbox(raw: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|s| s.trim().parse().ok())
        .collect::<Option<Vec<f64>>>()?;
    if parts.len() != 4 {
        return None;
    }
    Some(BoundingBox {
        south: parts[0],
        west: parts[1],
        north: parts[2],
        east: parts[3],
    })
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/categories", get(list_categories))
        .route("/categories/:id/features", get(category_features))
        .route("/features", get(bbox_features))
        .with_state(state)
}
