use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::cache::ResponseCache;
use crate::config::Config;

#[derive(Error, Debug)]
pub enum OverpassError {
    #[error("No Overpass endpoints configured")]
    NoEndpoints,
    #[error("All Overpass endpoints failed after {attempts} attempts")]
    EndpointsExhausted { attempts: u32 },
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Full passes through the endpoint list before giving up.
    pub cycles: u32,
    pub base_delay: Duration,
}

/// Client for the interchangeable Overpass mirrors. Rotation is an explicit
/// cursor over an injected endpoint list, which keeps the failover order
/// deterministic and testable.
pub struct OverpassClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
    cursor: AtomicUsize,
    retry: RetryPolicy,
    cache: ResponseCache,
}

impl OverpassClient {
    pub fn new(config: &Config, cache: ResponseCache) -> Self {
        Self::with_endpoints(
            config.overpass_endpoints.clone(),
            RetryPolicy {
                cycles: config.retry_cycles,
                base_delay: Duration::from_millis(config.retry_base_delay_ms),
            },
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
            cache,
        )
    }

    pub fn with_endpoints(
        endpoints: Vec<String>,
        retry: RetryPolicy,
        user_agent: &str,
        timeout: Duration,
        cache: ResponseCache,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            endpoints,
            cursor: AtomicUsize::new(0),
            retry,
            cache,
        }
    }

    fn current_endpoint(&self) -> &str {
        &self.endpoints[self.cursor.load(Ordering::Relaxed) % self.endpoints.len()]
    }

    fn switch_endpoint(&self) {
        self.cursor.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Switching to endpoint: {}", self.current_endpoint());
    }

    /// Fetch a query's payload, consulting the cache first unless
    /// `force_refresh` is set. Transport failures and non-200 statuses
    /// rotate through the mirrors; only exhausting the whole retry budget
    /// surfaces an error to the caller.
    pub async fn fetch(
        &self,
        query: &str,
        query_type: &str,
        force_refresh: bool,
    ) -> Result<Value, OverpassError> {
        if !force_refresh {
            if let Some(cached) = self.cache.get(query_type).await {
                return Ok(cached);
            }
        }

        if self.endpoints.is_empty() {
            return Err(OverpassError::NoEndpoints);
        }

        let max_attempts = self.retry.cycles * self.endpoints.len() as u32;
        let mut delay = self.retry.base_delay;

        for attempt in 0..max_attempts {
            let endpoint = self.current_endpoint();
            tracing::info!("Querying {} for {} data", endpoint, query_type);

            match self.http.post(endpoint).form(&[("data", query)]).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == reqwest::StatusCode::OK {
                        match response.json::<Value>().await {
                            Ok(payload) if !payload.is_null() => {
                                self.cache.put(query_type, &payload).await;
                                return Ok(payload);
                            }
                            Ok(_) => tracing::warn!("Empty payload from {}", endpoint),
                            Err(e) => tracing::warn!("Unreadable payload from {}: {}", endpoint, e),
                        }
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        tracing::warn!("Rate limited, waiting longer before retry");
                        sleep(jittered(delay * 5)).await;
                    } else {
                        tracing::warn!("HTTP error from {}: {}", endpoint, status);
                    }
                }
                Err(e) => tracing::error!("Request failed: {}", e),
            }

            // A full pass over every mirror doubles the delay.
            if (attempt + 1) % self.endpoints.len() as u32 == 0 {
                delay *= 2;
            }
            self.switch_endpoint();
            sleep(jittered(delay)).await;
        }

        tracing::error!("All API endpoints failed after {} attempts", max_attempts);
        Err(OverpassError::EndpointsExhausted {
            attempts: max_attempts,
        })
    }
}

fn jittered(delay: Duration) -> Duration {
    delay.mul_f64(1.0 + 0.25 * fastrand::f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    async fn test_cache() -> (ResponseCache, SqlitePool) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let cache = ResponseCache::new(pool.clone(), 24);
        cache.init_tables().await.unwrap();
        (cache, pool)
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    async fn failing_server(hits: Arc<AtomicUsize>) -> String {
        let router = Router::new().route(
            "/",
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }),
        );
        spawn(router).await
    }

    async fn ok_server(payload: Value) -> String {
        let router = Router::new().route("/", post(move || async move { Json(payload) }));
        spawn(router).await
    }

    fn fast_client(endpoints: Vec<String>, cache: ResponseCache) -> OverpassClient {
        OverpassClient::with_endpoints(
            endpoints,
            RetryPolicy {
                cycles: 3,
                base_delay: Duration::from_millis(1),
            },
            "test-agent",
            Duration::from_secs(2),
            cache,
        )
    }

    #[tokio::test]
    async fn test_failover_reaches_third_endpoint() {
        let (cache, pool) = test_cache().await;
        let failures = Arc::new(AtomicUsize::new(0));
        let bad = failing_server(failures.clone()).await;
        let bad2 = failing_server(failures.clone()).await;
        let good = ok_server(json!({"elements": [{"type": "node", "id": 1, "lat": 0.0, "lon": 0.0}]})).await;

        let client = fast_client(vec![bad, bad2, good], cache);
        let payload = client.fetch("[out:json];", "schools", false).await.unwrap();

        assert_eq!(failures.load(Ordering::SeqCst), 2);
        assert_eq!(payload["elements"].as_array().unwrap().len(), 1);

        // Exactly one cache entry written for the successful fetch.
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM overpass_cache")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_retry_budget_is_cycles_times_endpoints() {
        let (cache, _pool) = test_cache().await;
        let hits = Arc::new(AtomicUsize::new(0));
        let bad = failing_server(hits.clone()).await;

        let client = fast_client(vec![bad.clone(), bad.clone(), bad], cache);
        let result = client.fetch("[out:json];", "schools", false).await;

        assert!(matches!(
            result,
            Err(OverpassError::EndpointsExhausted { attempts: 9 })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_on_next_endpoint() {
        let (cache, _pool) = test_cache().await;
        let limited = Arc::new(AtomicUsize::new(0));
        let hits = limited.clone();
        let router = Router::new().route(
            "/",
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::TOO_MANY_REQUESTS
                }
            }),
        );
        let slow = spawn(router).await;
        let good = ok_server(json!({"elements": []})).await;

        let client = fast_client(vec![slow, good], cache);
        let payload = client.fetch("[out:json];", "parks", false).await.unwrap();

        assert_eq!(limited.load(Ordering::SeqCst), 1);
        assert_eq!(payload, json!({"elements": []}));
    }

    #[tokio::test]
    async fn test_fresh_cache_short_circuits_network() {
        let (cache, _pool) = test_cache().await;
        cache.put("schools", &json!({"elements": []})).await;

        let hits = Arc::new(AtomicUsize::new(0));
        let bad = failing_server(hits.clone()).await;

        let client = fast_client(vec![bad], cache);
        let payload = client.fetch("[out:json];", "schools", false).await.unwrap();

        assert_eq!(payload, json!({"elements": []}));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let (cache, _pool) = test_cache().await;
        cache.put("schools", &json!({"stale": true})).await;

        let good = ok_server(json!({"elements": [], "fresh": true})).await;
        let client = fast_client(vec![good], cache.clone());

        let payload = client.fetch("[out:json];", "schools", true).await.unwrap();
        assert_eq!(payload["fresh"], json!(true));

        // The refreshed payload replaced the cached one.
        assert_eq!(cache.get("schools").await.unwrap()["fresh"], json!(true));
    }
}
