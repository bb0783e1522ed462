//! Shared HTTP plumbing: client construction, retry with backoff, JSON decoding.
//!
//! Only idempotent GETs go through here. Retried:
//! - timeouts and connection failures
//! - 5xx, 408 and 429 responses
//!
//! Everything else (4xx, decode errors) is returned immediately.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{LookupError, GENERIC_PROVIDER_MESSAGE};

const USER_AGENT: &str = concat!("Clima/", env!("CARGO_PKG_VERSION"));

/// Backoff settings for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

pub fn build_client(timeout: Duration) -> Result<Client, LookupError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    error.status().is_some_and(is_retryable_status)
}

/// Run `operation` until it yields a non-retryable result or the policy is exhausted.
///
/// A retryable status on the final attempt is returned as-is so the caller can
/// read the provider's error body.
pub async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let last = attempt >= policy.max_retries;
        match operation().await {
            Ok(response) if !last && is_retryable_status(response.status()) => {
                tracing::warn!(
                    "Request returned retryable status {}, attempt {} of {}",
                    response.status(),
                    attempt + 1,
                    policy.max_retries + 1
                );
            }
            Err(e) if !last && is_retryable_error(&e) => {
                tracing::warn!(
                    "Retryable error on attempt {} of {}: {}",
                    attempt + 1,
                    policy.max_retries + 1,
                    e
                );
            }
            other => {
                if attempt > 0 && other.is_ok() {
                    tracing::info!("Request completed after {} retries", attempt);
                }
                return other;
            }
        }

        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
        attempt += 1;
    }
}

/// Error body shape shared by OpenWeatherMap and IBGE.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Decode a successful response, or turn a failed one into `LookupError::Provider`
/// carrying the body's `message` when present.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, LookupError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        return serde_json::from_slice(&bytes)
            .map_err(|e| LookupError::Parse(format!("JSON parse error: {}", e)));
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    tracing::debug!("Request failed with status {}: {}", status, text);
    Err(LookupError::Provider(
        message.unwrap_or_else(|| GENERIC_PROVIDER_MESSAGE.to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(30), Duration::from_millis(300));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/flaky", server.uri());
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let response = send_with_retry(&policy, || client.get(&url).send())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_error_body_message_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404",
                "message": "city not found"
            })))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let response = client
            .get(format!("{}/weather", server.uri()))
            .send()
            .await
            .unwrap();
        let result: Result<serde_json::Value, _> = read_json(response).await;
        assert!(matches!(result, Err(LookupError::Provider(ref m)) if m == "city not found"));
    }

    #[tokio::test]
    async fn test_missing_message_falls_back_to_generic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let response = client
            .get(format!("{}/weather", server.uri()))
            .send()
            .await
            .unwrap();
        let result: Result<serde_json::Value, _> = read_json(response).await;
        assert!(
            matches!(result, Err(LookupError::Provider(ref m)) if m == GENERIC_PROVIDER_MESSAGE)
        );
    }
}
