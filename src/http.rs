//! Blocking HTTP transport with bounded retries.
//!
//! Handlers talk to the search API through the [`Transport`] trait so the
//! client can be injected: [`HttpClient`] in production, in-memory fakes in
//! tests. Retries cover connection failures, I/O errors (read timeouts
//! included) and the statuses in [`RetryPolicy::status_forcelist`]; every
//! other failure is returned immediately.

use serde_json::Value;
use url::Url;

use crate::config::{FetcherConfig, RetryPolicy};
use crate::error::{HnResult, UpstreamError};

/// Fetches one JSON document per call.
pub trait Transport {
    fn get_json(&self, url: &Url) -> HnResult<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get_json(&self, url: &Url) -> HnResult<Value> {
        (**self).get_json(url)
    }
}

/// `ureq`-backed transport.
pub struct HttpClient {
    agent: ureq::Agent,
    retry: RetryPolicy,
}

/// A failed attempt, classified for the retry decision.
enum Attempt {
    Retryable(String),
    Fatal(UpstreamError),
}

impl HttpClient {
    pub fn new(config: &FetcherConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            retry: config.retry.clone(),
        }
    }

    fn attempt(&self, url: &Url) -> Result<Value, Attempt> {
        match self.agent.request_url("GET", url).call() {
            Ok(response) => response.into_json::<Value>().map_err(|e| {
                Attempt::Fatal(UpstreamError::Decode {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }),
            Err(ureq::Error::Status(status, _)) if self.retry.retries_status(status) => {
                Err(Attempt::Retryable(format!("HTTP {status}")))
            }
            Err(ureq::Error::Status(status, _)) => Err(Attempt::Fatal(UpstreamError::Status {
                url: url.to_string(),
                status,
            })),
            Err(ureq::Error::Transport(transport)) => match transport.kind() {
                ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Io => {
                    Err(Attempt::Retryable(transport.to_string()))
                }
                _ => Err(Attempt::Fatal(UpstreamError::Transport {
                    url: url.to_string(),
                    message: transport.to_string(),
                })),
            },
        }
    }
}

impl Transport for HttpClient {
    fn get_json(&self, url: &Url) -> HnResult<Value> {
        let mut retry = 0;
        loop {
            tracing::debug!(url = %url, attempt = retry + 1, "GET");
            let message = match self.attempt(url) {
                Ok(body) => return Ok(body),
                Err(Attempt::Fatal(e)) => return Err(e.into()),
                Err(Attempt::Retryable(message)) => message,
            };

            if retry >= self.retry.max_retries {
                return Err(UpstreamError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: retry + 1,
                    message,
                }
                .into());
            }

            let delay = self.retry.backoff(retry);
            tracing::warn!(
                url = %url,
                attempt = retry + 1,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "transient upstream failure, retrying"
            );
            std::thread::sleep(delay);
            retry += 1;
        }
    }
}
