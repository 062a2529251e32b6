//! Shared HTTP transport for all endpoint variants.
//!
//! Owns the lazily-created connection pool, the timeout ceiling, and the
//! retry/backoff loop. Wire shaping stays in the variants; everything that
//! must behave identically across providers lives here.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::error::EndpointError;
use crate::infrastructure::logging::redact_secrets;

/// Hard ceiling on the request timeout, regardless of configuration.
const TIMEOUT_CEILING_SECS: u64 = 300;

/// Connections kept idle per host in the pool.
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Reusable HTTP transport with retry and backoff.
#[derive(Debug)]
pub struct EndpointTransport {
    timeout: Duration,
    max_retries: u32,
    client: Mutex<Option<Client>>,
}

impl EndpointTransport {
    /// Create a transport. `timeout_secs` is clamped to 300 seconds.
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs.min(TIMEOUT_CEILING_SECS)),
            max_retries,
            client: Mutex::new(None),
        }
    }

    /// Delay before the retry that follows failed attempt `attempt`
    /// (0-indexed): `2^attempt + 0.5` seconds.
    pub fn backoff_delay(attempt: u32) -> Duration {
        let base = 1u64
            .checked_shl(attempt)
            .unwrap_or(u64::MAX / 1000)
            .saturating_mul(1000);
        Duration::from_millis(base.saturating_add(500))
    }

    /// Get or lazily create the pooled client.
    async fn client(&self) -> Result<Client, EndpointError> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the pooled client. The next request creates a fresh one.
    pub async fn close(&self) {
        self.client.lock().await.take();
    }

    /// POST a JSON body and parse a JSON response, retrying retryable
    /// failures up to `max_retries` additional attempts. Exhausting the
    /// budget surfaces the last error.
    pub async fn post_json(
        &self,
        endpoint_name: &str,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, EndpointError> {
        let client = self.client().await?;
        let mut attempt: u32 = 0;

        loop {
            match Self::execute(&client, url, headers, body).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(endpoint = endpoint_name, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = Self::backoff_delay(attempt);
                    warn!(
                        endpoint = endpoint_name,
                        retry = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %redact_secrets(&err.to_string()),
                        "transient endpoint failure, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One request/response cycle with status classification.
    async fn execute(
        client: &Client,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, EndpointError> {
        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(EndpointError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}
