//! The HTTPS requester (§4.1): conditional `GET` against the datafile CDN
//! with retry/backoff, abstracted behind a trait so tests can substitute a
//! fake transport without a real socket.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{
    backoff::Backoff as _,
    ExponentialBackoff,
};
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Transport-level failures, distinct from a parse failure on an otherwise
/// successful response body.
#[derive(Debug, Error)]
pub enum RequesterError {
    #[error("network error fetching datafile: {0}")]
    Network(String),
    #[error("datafile request returned HTTP {0}")]
    HttpStatus(u16),
    #[error("failed to read datafile response body: {0}")]
    Body(String),
    #[error("datafile request exceeded its attempt budget")]
    AttemptsExhausted,
}

/// The result of a single conditional `GET`.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The server returned a new body (HTTP 200) along with its `ETag`.
    Modified { bytes: Vec<u8>, etag: Option<String> },
    /// The server returned HTTP 304: the caller's cached copy is current.
    NotModified,
}

/// The transport boundary the [`PollingConfigManager`](crate::config_manager::PollingConfigManager)
/// depends on. `HttpRequester` is the production implementation; tests
/// substitute an in-memory fake.
#[async_trait]
pub trait DatafileTransport: Send + Sync {
    async fn get(&self, previous_etag: Option<&str>) -> Result<FetchOutcome, RequesterError>;
}

/// Tunables for [`HttpRequester`]: per-attempt timeout, attempt budget, and
/// the bounds of its exponential-backoff-with-full-jitter retry policy.
#[derive(Debug, Clone)]
pub struct RequesterConfig {
    pub url: String,
    pub per_attempt_timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RequesterConfig {
    pub fn for_sdk_key(sdk_key: &str) -> Self {
        Self {
            url: format!("https://cdn.optimizely.com/datafiles/{sdk_key}.json"),
            per_attempt_timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// A `reqwest`-backed [`DatafileTransport`]. Sends `If-None-Match` with the
/// last-seen `ETag` and retries retryable network/5xx failures with
/// bounded exponential backoff + full jitter, via the `backoff` crate's
/// async retry helper.
pub struct HttpRequester {
    client: reqwest::Client,
    config: RequesterConfig,
}

impl HttpRequester {
    pub fn new(config: RequesterConfig) -> Result<Self, RequesterError> {
        let client = reqwest::Client::builder()
            .timeout(config.per_attempt_timeout)
            .build()
            .map_err(|e| RequesterError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            max_elapsed_time: Some(self.config.max_backoff * self.config.max_attempts),
            randomization_factor: 1.0,
            ..ExponentialBackoff::default()
        }
    }

    async fn attempt_once(&self, previous_etag: Option<&str>) -> Result<FetchOutcome, backoff::Error<RequesterError>> {
        let mut request = self.client.get(&self.config.url);
        if let Some(etag) = previous_etag {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                backoff::Error::transient(RequesterError::Network(e.to_string()))
            } else {
                backoff::Error::permanent(RequesterError::Network(e.to_string()))
            }
        })?;

        let status = response.status();
        if status.as_u16() == 304 {
            return Ok(FetchOutcome::NotModified);
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(RequesterError::HttpStatus(status.as_u16())));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(RequesterError::HttpStatus(status.as_u16())));
        }

        let etag = response.headers().get(reqwest::header::ETAG).and_then(|v| v.to_str().ok()).map(str::to_owned);
        let bytes = response.bytes().await.map_err(|e| backoff::Error::permanent(RequesterError::Body(e.to_string())))?;
        Ok(FetchOutcome::Modified {
            bytes: bytes.to_vec(),
            etag,
        })
    }
}

#[async_trait]
impl DatafileTransport for HttpRequester {
    async fn get(&self, previous_etag: Option<&str>) -> Result<FetchOutcome, RequesterError> {
        let mut policy = self.backoff_policy();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.attempt_once(previous_etag).await {
                Ok(outcome) => return Ok(outcome),
                Err(backoff::Error::Permanent(e)) => return Err(e),
                Err(backoff::Error::Transient { err, retry_after }) => {
                    if attempts >= self.config.max_attempts {
                        tracing::warn!(attempts, error = %err, "datafile request exhausted its attempt budget");
                        return Err(RequesterError::AttemptsExhausted);
                    }
                    let delay = retry_after.or_else(|| policy.next_backoff());
                    match delay {
                        Some(delay) => {
                            tracing::warn!(attempts, error = %err, ?delay, "retrying datafile request");
                            tokio::time::sleep(delay).await;
                        },
                        None => return Err(err),
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{
        AtomicU32,
        Ordering,
    };

    use super::*;

    /// An in-memory fake transport for exercising the config manager
    /// without a real socket: each call pops the next scripted outcome.
    pub struct FakeTransport {
        pub responses: parking_lot::Mutex<Vec<Result<FetchOutcome, RequesterError>>>,
        pub calls: AtomicU32,
    }

    impl FakeTransport {
        pub fn new(responses: Vec<Result<FetchOutcome, RequesterError>>) -> Self {
            Self {
                responses: parking_lot::Mutex::new(responses),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DatafileTransport for FakeTransport {
        async fn get(&self, _previous_etag: Option<&str>) -> Result<FetchOutcome, RequesterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Ok(FetchOutcome::NotModified);
            }
            responses.remove(0)
        }
    }

    #[tokio::test]
    async fn fake_transport_serves_scripted_responses_in_order() {
        let transport = FakeTransport::new(vec![
            Ok(FetchOutcome::Modified {
                bytes: b"one".to_vec(),
                etag: Some("e1".to_owned()),
            }),
            Ok(FetchOutcome::NotModified),
        ]);
        let first = transport.get(None).await.unwrap();
        assert!(matches!(first, FetchOutcome::Modified { .. }));
        let second = transport.get(Some("e1")).await.unwrap();
        assert!(matches!(second, FetchOutcome::NotModified));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
