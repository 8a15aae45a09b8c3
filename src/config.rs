use serde::{Deserialize, Serialize};
use std::env;

use crate::overpass::BoundingBox;

const DEFAULT_ENDPOINTS: &str = "https://overpass-api.de/api/interpreter,\
https://overpass.kumi.systems/api/interpreter,\
https://maps.mail.ru/osm/tools/overpass/api/interpreter";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub region_name: String,
    pub region_admin_level: String,
    pub region_bbox: BoundingBox,
    pub overpass_endpoints: Vec<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub retry_cycles: u32,
    pub retry_base_delay_ms: u64,
    pub cache_ttl_hours: i64,
    pub database_url: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            region_name: env::var("REGION_NAME").unwrap_or_else(|_| "Palmela".to_string()),
            region_admin_level: env::var("REGION_ADMIN_LEVEL").unwrap_or_else(|_| "8".to_string()),
            region_bbox: BoundingBox {
                south: parse_env("REGION_BBOX_SOUTH", 38.54)?,
                west: parse_env("REGION_BBOX_WEST", -8.92)?,
                north: parse_env("REGION_BBOX_NORTH", 38.64)?,
                east: parse_env("REGION_BBOX_EAST", -8.58)?,
            },
            overpass_endpoints: env::var("OVERPASS_ENDPOINTS")
                .unwrap_or_else(|_| DEFAULT_ENDPOINTS.to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            user_agent: env::var("OVERPASS_USER_AGENT")
                .unwrap_or_else(|_| "PalmelaThematicMapsApp/1.0".to_string()),
            request_timeout_secs: parse_env("OVERPASS_TIMEOUT_SECS", 30)?,
            retry_cycles: parse_env("OVERPASS_RETRY_CYCLES", 3)?,
            retry_base_delay_ms: parse_env("OVERPASS_RETRY_DELAY_MS", 2000)?,
            cache_ttl_hours: parse_env("CACHE_TTL_HOURS", 24)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./palmela_maps.db".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
