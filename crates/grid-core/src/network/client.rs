//! HTTP client shared by release sources, registries and downloads.
//!
//! Applies the shell's user agent and timeout, remembers the most recent
//! rate limit quota reported by the server and maps transport failures onto
//! [`GridError`].

use crate::config::{AppConfig, NetworkConfig};
use crate::{GridError, Result};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Quota reported through `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitQuota {
    pub remaining: u64,
    pub limit: Option<u64>,
}

pub struct HttpClient {
    inner: Client,
    timeout: Duration,
    quota: Mutex<Option<RateLimitQuota>>,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Client whose requests give up after `timeout`. Downloads use a longer
    /// one than API calls.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let inner = Client::builder()
            .user_agent(AppConfig::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GridError::Network {
                message: format!("Cannot build HTTP client: {}", e),
                source: Some(e),
            })?;
        Ok(Self {
            inner,
            timeout,
            quota: Mutex::new(None),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Quota from the last response that carried rate limit headers.
    pub fn rate_limit(&self) -> Option<RateLimitQuota> {
        *self.quota.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(url, self.inner.get(url)).await
    }

    /// GET with an explicit `Accept` header, e.g. a versioned API media type.
    pub async fn get_accepting(&self, url: &str, accept: &str) -> Result<Response> {
        self.send(url, self.inner.get(url).header(header::ACCEPT, accept))
            .await
    }

    /// GET and decode a JSON body. A non-success status is
    /// [`GridError::SourceUnavailable`].
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GridError::SourceUnavailable {
                source_name: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }
        response.json::<T>().await.map_err(|e| GridError::Json {
            message: format!("Bad JSON from {}: {}", url, e),
            source: None,
        })
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GridError::Timeout(self.timeout)
            } else {
                GridError::Network {
                    message: format!("GET {} failed: {}", url, e),
                    source: Some(e),
                }
            }
        })?;

        if let Some(quota) = read_quota(&response) {
            debug!("{} requests left on {}", quota.remaining, extract_domain(url));
            if quota.remaining == 0 {
                warn!("Rate limit exhausted for {}", extract_domain(url));
            }
            *self.quota.lock().unwrap_or_else(|e| e.into_inner()) = Some(quota);
        }

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(GridError::RateLimited {
                service: extract_domain(url),
                retry_after_secs: header_u64(&response, header::RETRY_AFTER.as_str()),
            });
        }
        Ok(response)
    }
}

/// Statuses worth retrying: timeouts, throttling and gateway errors.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Host part of `url`, or `"unknown"`.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_quota(response: &Response) -> Option<RateLimitQuota> {
    Some(RateLimitQuota {
        remaining: header_u64(response, "x-ratelimit-remaining")?,
        limit: header_u64(response, "x-ratelimit-limit"),
    })
}

fn header_u64(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
