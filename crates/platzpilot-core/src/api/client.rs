//! API client for the PlatzPilot seat-availability server.
//!
//! Two endpoints exist: `/api/libraries` returns the full dataset wrapped in
//! a `{ data, metadata }` envelope, `/api/health` reports server status.
//! Dataset fetches retry on transport failures and 5xx responses with linear
//! backoff; timeouts and 4xx responses abort immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::LibraryData;

use super::ApiError;

/// Response envelope for the dataset endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default)]
    pub metadata: Option<ResponseMetadata>,
}

/// Server-side bookkeeping attached to a dataset response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub server_time: Option<String>,
    #[serde(default)]
    pub total_locations: Option<i64>,
}

/// Payload of the `/api/health` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub data_available: bool,
    #[serde(default)]
    pub last_data_update: Option<String>,
}

/// Transport seam between the synchronizer and the network.
///
/// The production implementation is [`ApiClient`]; tests substitute fakes to
/// script failures and count calls.
#[async_trait]
pub trait LibraryGateway: Send + Sync {
    /// Fetch the current dataset, retrying per the configured policy.
    async fn fetch_libraries(&self) -> Result<ApiResponse<LibraryData>, ApiError>;

    /// Check server health. Single attempt, short timeout.
    async fn check_health(&self) -> Result<HealthStatus, ApiError>;
}

/// API client for the PlatzPilot server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Config,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// The underlying client carries no default timeout; each request sets
    /// its own, since dataset fetches and health checks use different ones.
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Client::builder().build().map_err(ApiError::from_reqwest)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Test if the API server is reachable.
    pub async fn is_reachable(&self) -> bool {
        self.check_health().await.is_ok()
    }

    async fn fetch_libraries_once(&self) -> Result<ApiResponse<LibraryData>, ApiError> {
        let url = format!("{}/api/libraries", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .timeout(self.config.request_timeout())
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let text = response.text().await.map_err(ApiError::from_reqwest)?;
        Self::parse_libraries_payload(&text)
    }

    /// Parse and validate a 2xx dataset body.
    ///
    /// A payload that deserializes but contains no locations at all is
    /// treated as invalid rather than cached as an empty snapshot.
    fn parse_libraries_payload(text: &str) -> Result<ApiResponse<LibraryData>, ApiError> {
        let parsed: ApiResponse<LibraryData> = serde_json::from_str(text)
            .map_err(|e| ApiError::InvalidResponse(format!("malformed payload: {}", e)))?;

        if parsed.data.is_empty() {
            return Err(ApiError::InvalidResponse(
                "payload contains no locations".to_string(),
            ));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl LibraryGateway for ApiClient {
    async fn fetch_libraries(&self) -> Result<ApiResponse<LibraryData>, ApiError> {
        let response = with_retries(
            self.config.retry_attempts,
            self.config.retry_base_delay(),
            |_attempt| self.fetch_libraries_once(),
        )
        .await?;

        if let Some(ref metadata) = response.metadata {
            debug!(
                total_locations = ?metadata.total_locations,
                last_update = ?metadata.last_update,
                "Library data fetched"
            );
        }
        Ok(response)
    }

    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        let url = format!("{}/api/health", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .timeout(self.config.health_timeout())
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        response.json().await.map_err(ApiError::from_reqwest)
    }
}

/// Run `op` up to `attempts` times, sleeping `attempt * base_delay` between
/// tries (linear backoff: 1s, 2s, ... with the default base delay).
///
/// Non-retryable errors abort immediately and pass through unchanged;
/// exhausting the budget wraps the last cause in `RetriesExhausted`.
async fn with_retries<T, F, Fut>(attempts: u32, base_delay: Duration, mut op: F) -> Result<T, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt >= attempts {
                    return Err(ApiError::RetriesExhausted {
                        attempts,
                        source: Box::new(err),
                    });
                }
                warn!(attempt, attempts, error = %err, "Request failed, will retry");
                tokio::time::sleep(base_delay * attempt).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn server_error() -> ApiError {
        ApiError::from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    }

    const TWO_CATEGORY_PAYLOAD: &str = r#"{
        "data": {
            "FBIB": [{
                "long_name": "Fachbibliothek Chemie",
                "url": null, "building": null, "level": null, "room": null,
                "geo_coordinates": "49.01,8.41",
                "available_seats": 60,
                "opening_hours": {"Monday": [["09:00", "17:00"]]},
                "free_seats_currently": 12
            }],
            "BIBN": []
        },
        "metadata": {
            "last_update": null,
            "server_time": "2025-06-02T10:15:00",
            "total_locations": 1
        }
    }"#;

    #[test]
    fn test_parse_libraries_payload() {
        let response = ApiClient::parse_libraries_payload(TWO_CATEGORY_PAYLOAD)
            .expect("payload should parse");
        assert_eq!(response.data.fbib.len(), 1);
        assert_eq!(response.data.total_len(), 1);

        let metadata = response.metadata.expect("metadata present");
        assert_eq!(metadata.total_locations, Some(1));
        assert_eq!(metadata.last_update, None);
    }

    #[test]
    fn test_parse_libraries_payload_rejects_missing_data() {
        let err = ApiClient::parse_libraries_payload(r#"{"metadata": {}}"#)
            .expect_err("missing data field must fail");
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_libraries_payload_rejects_empty_dataset() {
        let err = ApiClient::parse_libraries_payload(r#"{"data": {"FBIB": [], "BIBN": []}}"#)
            .expect_err("all-empty dataset must fail");
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_health_status() {
        let json = r#"{"status": "healthy", "data_available": true,
                       "last_data_update": "2025-06-02T10:14:30"}"#;
        let health: HealthStatus = serde_json::from_str(json).unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.data_available);

        // Degraded server: no data yet, no last update
        let json = r#"{"status": "starting", "data_available": false}"#;
        let health: HealthStatus = serde_json::from_str(json).unwrap();
        assert!(!health.data_available);
        assert_eq!(health.last_data_update, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retries_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = with_retries(3, Duration::from_secs(1), |attempt| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(server_error())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Linear backoff: 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_recovers_after_two_server_errors() {
        // 503, 503, then a valid three-category body on the third attempt
        let payload = r#"{
            "data": {
                "FBIB": [{
                    "long_name": "F", "url": null, "building": null, "level": null,
                    "room": null, "geo_coordinates": "49.0,8.4", "available_seats": 10,
                    "opening_hours": {}, "free_seats_currently": 2
                }],
                "LAFAS": [{
                    "long_name": "L", "url": null, "building": null, "level": null,
                    "room": null, "geo_coordinates": "49.1,8.4", "available_seats": 20,
                    "opening_hours": {}, "free_seats_currently": 7
                }],
                "BIBN": [{
                    "long_name": "N", "url": null, "building": null, "level": null,
                    "room": null, "geo_coordinates": "49.2,8.4", "available_seats": 30,
                    "opening_hours": {}, "free_seats_currently": 1
                }]
            }
        }"#;
        let started = tokio::time::Instant::now();

        let response = with_retries(3, Duration::from_secs(1), |attempt| async move {
            if attempt < 3 {
                Err(server_error())
            } else {
                ApiClient::parse_libraries_payload(payload)
            }
        })
        .await
        .expect("third attempt should succeed");

        assert_eq!(response.data.total_len(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retries_exhaustion_carries_last_cause_and_count() {
        let result: Result<(), ApiError> =
            with_retries(3, Duration::from_secs(1), |_| async { Err(server_error()) }).await;

        match result.unwrap_err() {
            ApiError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ApiError::Server { status: 503, .. }));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retries_does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = with_retries(3, Duration::from_secs(1), |_| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::from_status(reqwest::StatusCode::NOT_FOUND, "{}"))
            }
        })
        .await;

        assert!(matches!(result.unwrap_err(), ApiError::Client { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retries_does_not_retry_timeouts() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), ApiError> = with_retries(3, Duration::from_secs(1), |_| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Timeout)
            }
        })
        .await;

        assert!(matches!(result.unwrap_err(), ApiError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Aborted without sleeping through any backoff
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
