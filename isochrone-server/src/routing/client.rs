//! OJP HTTP client.
//!
//! Posts trip requests to the Open Journey Planner endpoint and decodes the
//! responses. Requests pass a concurrency semaphore and a per-minute quota
//! limiter before they go out.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::RoutingBackend;
use super::decode::{TripResponse, decode_trip_response};
use super::error::RoutingError;
use super::request::TripQuery;

/// Default OJP endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.opentransportdata.swiss/ojp2020";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 100;

/// Default request quota per minute.
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 100;

type Limiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Configuration for the OJP client.
#[derive(Debug, Clone)]
pub struct OjpConfig {
    /// Bearer token for authentication
    pub api_key: String,
    /// Endpoint URL
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Requests allowed per minute
    pub requests_per_minute: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OjpConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            timeout_secs: 30,
        }
    }

    /// Set a custom endpoint (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set the per-minute request quota.
    pub fn with_requests_per_minute(mut self, n: u32) -> Self {
        self.requests_per_minute = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// OJP trip API client.
#[derive(Debug, Clone)]
pub struct OjpClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
    limiter: Limiter,
}

impl OjpClient {
    /// Create a new OJP client with the given configuration.
    pub fn new(config: OjpConfig) -> Result<Self, RoutingError> {
        if config.api_key.is_empty() {
            return Err(RoutingError::NotConfigured("OJP API key is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| RoutingError::NotConfigured("invalid API key format".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            RoutingError::NotConfigured("request quota must be positive".to_string())
        })?;
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            http,
            base_url: config.base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            limiter,
        })
    }

    /// Route one trip.
    pub async fn fetch_trip(&self, query: &TripQuery) -> Result<TripResponse, RoutingError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RoutingError::ApiError {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;
        self.limiter.until_ready().await;

        debug!(mode = %query.mode, "sending trip request");
        let response = self
            .http
            .post(&self.base_url)
            .body(query.to_xml())
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RoutingError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("routing API rate limit hit");
            return Err(RoutingError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;
        decode_trip_response(&body)
    }
}

impl RoutingBackend for OjpClient {
    async fn trip(&self, query: &TripQuery) -> Result<TripResponse, RoutingError> {
        self.fetch_trip(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let config = OjpConfig::new("secret")
            .with_base_url("http://localhost:9999")
            .with_max_concurrent(4)
            .with_requests_per_minute(10)
            .with_timeout(5);
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.requests_per_minute, 10);
        assert_eq!(config.timeout_secs, 5);

        let defaults = OjpConfig::new("secret");
        assert_eq!(defaults.base_url, DEFAULT_BASE_URL);
        assert_eq!(defaults.max_concurrent, 100);
        assert_eq!(defaults.requests_per_minute, 100);
    }

    #[test]
    fn missing_key_is_not_configured() {
        assert!(matches!(
            OjpClient::new(OjpConfig::new("")),
            Err(RoutingError::NotConfigured(_))
        ));
        assert!(matches!(
            OjpClient::new(OjpConfig::new("k").with_requests_per_minute(0)),
            Err(RoutingError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_http_error() {
        let client = OjpClient::new(
            OjpConfig::new("k")
                .with_base_url("http://127.0.0.1:9")
                .with_timeout(2),
        )
        .unwrap();
        let query = TripQuery::new(
            geo::Point::new(8.54, 47.37),
            geo::Point::new(8.55, 47.38),
            crate::domain::Mode::Walk,
            super::super::request::TimeConstraint::DepartAt(chrono::Utc::now()),
            chrono::Utc::now(),
        );
        assert!(matches!(
            client.fetch_trip(&query).await,
            Err(RoutingError::Http(_))
        ));
    }
}
