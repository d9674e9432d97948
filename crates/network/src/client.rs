// crates/network/src/client.rs
//! JSON-over-HTTP client wrapper with bounded retries

use crate::error::{NetworkError, NetworkResult};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shelfwise_resilience::{retry_async, RetryDecision, RetryPolicy};
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Retry policy for transport failures and 5xx answers
    pub retry_policy: Option<RetryPolicy>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("Shelfwise/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            retry_policy: Some(RetryPolicy::new(2).with_initial_delay(Duration::from_millis(500))),
        }
    }
}

impl ClientConfig {
    /// Default configuration with a different timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// HTTP client used by metadata sources and language model clients
#[derive(Clone)]
pub struct Client {
    inner: ReqwestClient,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GETs `url` with query parameters and decodes a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> NetworkResult<T> {
        self.get_json_with_headers(url, query, &[]).await
    }

    /// GETs `url` with query parameters and extra headers, decoding a JSON body
    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> NetworkResult<T> {
        let response = self
            .send(url, || {
                with_headers(self.inner.get(url).query(query), headers)
            })
            .await?;
        decode(url, response).await
    }

    /// POSTs a JSON body and decodes a JSON answer
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> NetworkResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(url, || with_headers(self.inner.post(url).json(body), headers))
            .await?;
        decode(url, response).await
    }

    /// Sends a request built by `build`, retrying per the configured policy
    ///
    /// Non-success statuses become `NetworkError::Status` with the body kept.
    async fn send<F>(&self, url: &str, build: F) -> NetworkResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let build = &build;
        let attempt = || async move {
            let response = build().send().await.map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout
                } else {
                    NetworkError::Http(e)
                }
            })?;
            check_status(url, response).await
        };

        match &self.config.retry_policy {
            Some(policy) => {
                retry_async(policy, attempt, |e: &NetworkError| {
                    if e.is_retryable() {
                        RetryDecision::Retry
                    } else {
                        RetryDecision::Stop
                    }
                })
                .await
            }
            None => attempt().await,
        }
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request
}

async fn check_status(url: &str, response: Response) -> NetworkResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    log::debug!("{} answered HTTP {}", url, status.as_u16());
    Err(NetworkError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body,
        retry_after,
    })
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> NetworkResult<T> {
    let text = response.text().await.map_err(NetworkError::Http)?;
    serde_json::from_str(&text).map_err(|e| NetworkError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
