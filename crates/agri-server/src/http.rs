//! Shared outbound HTTP client with timeout, retry and backoff.
//!
//! Built once at startup and handed to every upstream client. Callers get a
//! [`FetchError`] and decide how to degrade; nothing here panics on bad input.

use crate::backoff::Backoff;
use crate::config::Config;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    /// 429, with the `Retry-After` delay when the upstream sent one.
    #[error("upstream rate limited the request")]
    RateLimited(Option<Duration>),
    #[error("upstream returned an XML document")]
    Xml,
    #[error("upstream body is not JSON: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status(404))
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.http_timeout_ms.max(1));
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            timeout,
            max_retries: config.http_max_retries,
            backoff_base: Duration::from_millis(config.http_backoff_base_ms),
            backoff_max: Duration::from_millis(config.http_backoff_max_ms),
        })
    }

    /// GET a JSON document, retrying transport errors, 429 and 5xx.
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let backoff = Backoff::new(self.backoff_base, self.backoff_max);
        let mut attempt = 0;
        loop {
            match self.try_get_json(url, query).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && should_retry(&err) => {
                    attempt += 1;
                    let hint = match &err {
                        FetchError::RateLimited(hint) => *hint,
                        _ => None,
                    };
                    let delay = backoff.delay_with_hint(attempt, hint);
                    tracing::debug!(
                        "GET {} failed ({}), retry {}/{} in {:?}",
                        url,
                        err,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(FetchError::RateLimited(retry_after));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let is_xml = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("xml"))
            .unwrap_or(false);
        if is_xml {
            return Err(FetchError::Xml);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

fn should_retry(err: &FetchError) -> bool {
    match err {
        FetchError::Transport(_) | FetchError::RateLimited(_) => true,
        FetchError::Status(code) => *code >= 500,
        FetchError::Xml | FetchError::Decode(_) => false,
    }
}
