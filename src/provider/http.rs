//! reqwest-backed transport, auth headers and HTTP status mapping.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::{BackendRequest, BackendResponse, ChatTransport};
use crate::config::LoopSettings;
use crate::error::TetherError;
use crate::models::ProviderKind;
use crate::util::retry::RetryPolicy;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Posts JSON bodies to `{base_url}{endpoint}` with retry on transient failures.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Transport with the auth headers, timeout and retry policy for `provider`.
    pub fn for_provider(
        provider: ProviderKind,
        base_url: impl Into<String>,
        api_key: Option<&str>,
        settings: &LoopSettings,
    ) -> Result<Self, TetherError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .pool_max_idle_per_host(10)
            .build()?;
        let headers = match (provider, api_key) {
            (ProviderKind::Anthropic, Some(key)) => anthropic_headers(key, ANTHROPIC_VERSION),
            (ProviderKind::Ollama, _) | (_, None) => json_headers(),
            (_, Some(key)) => bearer_headers(key),
        };
        Ok(Self::new(client, base_url, headers).with_retry(settings.retry_policy()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_once(&self, request: &BackendRequest) -> Result<BackendResponse, TetherError> {
        let url = format!("{}{}", self.base_url, request.endpoint);
        let resp = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&request.body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(BackendResponse::new(body))
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse, TetherError> {
        self.retry.execute(|| self.post_once(request)).await
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = json_headers();
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Build Anthropic-style headers (x-api-key).
pub fn anthropic_headers(api_key: &str, version: &str) -> HeaderMap {
    let mut headers = json_headers();
    if let Ok(val) = HeaderValue::from_str(api_key) {
        headers.insert("x-api-key", val);
    }
    if let Ok(val) = HeaderValue::from_str(version) {
        headers.insert("anthropic-version", val);
    }
    headers
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> TetherError {
    match status {
        401 | 403 => TetherError::Authentication(body.to_string()),
        429 => TetherError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => TetherError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_to_error_kinds() {
        assert!(matches!(
            status_to_error(401, "bad key"),
            TetherError::Authentication(_)
        ));
        assert!(matches!(
            status_to_error(429, r#"{"error":{"retry_after":1.5}}"#),
            TetherError::RateLimited {
                retry_after_ms: Some(1500)
            }
        ));
        assert!(matches!(
            status_to_error(429, "slow down"),
            TetherError::RateLimited {
                retry_after_ms: None
            }
        ));
        assert!(matches!(
            status_to_error(500, "oops"),
            TetherError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn provider_headers() {
        let headers = anthropic_headers("sk-ant", ANTHROPIC_VERSION);
        assert_eq!(headers["x-api-key"], "sk-ant");
        assert!(headers.get(AUTHORIZATION).is_none());

        let headers = bearer_headers("sk-test");
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
    }
}
