//! Request execution, response classification and throttle retry

use crate::auth::UploadAuth;
use crate::request::Request;
use crate::{ClientError, Config, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cooperative cancellation flag shared between a caller and its requests
#[derive(Clone, Debug, Default)]
pub struct CancellationSignal(Arc<AtomicBool>);

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort in-flight attempts and pending backoff of every request holding this signal
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Throttle retry bound and fixed delay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first throttled attempt
    pub max_retries: u32,
    /// Constant delay before each retry
    pub backoff: Duration,
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_throttle_retries,
            backoff: config.retry_backoff,
        }
    }
}

/// How a response status is handled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// 400: body carries the validation message
    Validation,
    /// 403: body carries the reason
    Forbidden,
    /// 413: no body is read
    TooLarge,
    /// 429: retried up to the bound
    Throttled,
    /// Any other status, including unlisted 4xx/5xx
    Success,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::Validation,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::PAYLOAD_TOO_LARGE => Self::TooLarge,
            StatusCode::TOO_MANY_REQUESTS => Self::Throttled,
            _ => Self::Success,
        }
    }
}

/// Executes built requests against the network
#[derive(Clone, Debug)]
pub struct Transport {
    http: reqwest::Client,
    upload_auth: Arc<dyn UploadAuth>,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(http: reqwest::Client, upload_auth: Arc<dyn UploadAuth>, policy: RetryPolicy) -> Self {
        Self {
            http,
            upload_auth,
            policy,
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn upload_auth(&self) -> &dyn UploadAuth {
        self.upload_auth.as_ref()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send `request`, retrying while the server throttles.
    ///
    /// Returns the response of the first attempt that is not classified as an
    /// error. Each attempt after the first re-encodes the payload.
    pub async fn send(&self, request: &mut Request<'_>) -> Result<Response> {
        let cancellation = request.cancellation().cloned();
        let cancellation = cancellation.as_ref();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if is_cancelled(cancellation) {
                return Err(ClientError::Cancelled);
            }

            let outgoing = match request.take_prepared() {
                Some(prepared) if attempt == 1 => prepared,
                _ => request.materialize(&self.http, self.upload_auth.as_ref())?,
            };

            debug!(
                attempt,
                method = %outgoing.method(),
                url = %outgoing.url(),
                "sending request"
            );

            let response = await_or_cancel(self.http.execute(outgoing), cancellation).await??;
            let status = response.status();
            debug!(attempt, status = status.as_u16(), "received response");

            match StatusClass::of(status) {
                StatusClass::Validation => {
                    let message = await_or_cancel(response.text(), cancellation).await??;
                    return Err(ClientError::Validation { message });
                }
                StatusClass::Forbidden => {
                    let message = await_or_cancel(response.text(), cancellation).await??;
                    return Err(ClientError::Forbidden { message });
                }
                StatusClass::TooLarge => return Err(ClientError::FileTooLarge),
                StatusClass::Throttled => {
                    drop(response);
                    if attempt > self.policy.max_retries {
                        warn!(attempts = attempt, "throttle retries exhausted");
                        return Err(ClientError::Throttled { attempts: attempt });
                    }
                    debug!(
                        attempt,
                        backoff_ms = self.policy.backoff.as_millis() as u64,
                        "throttled, backing off"
                    );
                    await_or_cancel(tokio::time::sleep(self.policy.backoff), cancellation).await?;
                }
                StatusClass::Success => {
                    if status.is_client_error() || status.is_server_error() {
                        warn!(status = status.as_u16(), "unclassified error status passed through as success");
                    }
                    return Ok(response);
                }
            }
        }
    }

    /// Send `request` and decode the JSON body into `T`
    pub async fn execute_json<T: DeserializeOwned>(&self, request: &mut Request<'_>) -> Result<T> {
        let response = self.send(request).await?;
        let body = await_or_cancel(response.bytes(), request.cancellation()).await??;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send `request` without decoding a result
    pub async fn execute(&self, request: &mut Request<'_>) -> Result<()> {
        let response = self.send(request).await?;
        // drain so the connection can go back to the pool
        if let Err(e) = await_or_cancel(response.bytes(), request.cancellation()).await? {
            debug!(error = %e, "failed to drain response body");
        }
        Ok(())
    }
}

fn is_cancelled(cancellation: Option<&CancellationSignal>) -> bool {
    cancellation.is_some_and(CancellationSignal::is_cancelled)
}

async fn await_or_cancel<F>(future: F, cancellation: Option<&CancellationSignal>) -> Result<F::Output>
where
    F: Future,
{
    let Some(signal) = cancellation else {
        return Ok(future.await);
    };

    tokio::pin!(future);
    loop {
        if signal.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            return Ok(output);
        }
    }
}
