//! # Trip Service Client
//!
//! This module handles all network operations for obtaining a trip calculation from
//! the computation backend. The backend can take a long time to answer (it geocodes
//! three stops and routes between them) and may be briefly unreachable, so requests
//! go through a small retry state machine.
//!
//! ## Request Protocol
//!
//! 1. **Send**: POST the [`TripRequest`] as JSON to `{base_url}/api/calculate-trip/`
//!    with a per-attempt timeout (120 s by default)
//! 2. **No response**: the network layer never reached a server. If attempts remain,
//!    wait `min(base * 2^attempt, max)` and try again
//! 3. **Response received**: classify it once and return. A server's considered
//!    rejection is never retried
//!
//! ## Error Classification
//!
//! | Response                                   | Result                         |
//! |--------------------------------------------|--------------------------------|
//! | 2xx with a trip body                       | `Ok(TripResponse)`             |
//! | `{"error": "..."}`                         | [`TripError::Validation`]      |
//! | `{"field": ["msg", ...], ...}`             | [`TripError::Validation`]      |
//! | any other non-2xx                          | [`TripError::Server`]          |
//! | no response after every attempt            | [`TripError::Connectivity`]    |
//!
//! The transport and the sleep are traits so the state machine can be driven in
//! tests without sockets or timers.

use crate::trip::{TripRequest, TripResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Path of the trip-calculation endpoint relative to the base URL
pub const CALCULATE_TRIP_PATH: &str = "/api/calculate-trip/";

/// Errors surfaced to the caller of [`TripClient::calculate_trip`].
#[derive(Error, Debug)]
pub enum TripError {
    /// Every attempt failed without reaching the server
    #[error("Unable to connect to server after {attempts} attempt(s). Please check if the backend is running.")]
    Connectivity { attempts: u32 },

    /// The server rejected the request on business-rule or schema grounds
    #[error("{0}")]
    Validation(String),

    /// Non-2xx response without structured detail
    #[error("Server error: {status}")]
    Server { status: u16 },

    /// 2xx response whose body is not a trip calculation
    #[error("invalid trip response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// The request failed local validation and was never sent
    #[error("{}", .0.join("; "))]
    InvalidRequest(Vec<String>),
}

/// The request never produced a response (refused, DNS, timeout, reset).
#[derive(Error, Debug)]
#[error("no response from trip service: {0}")]
pub struct TransportError(pub String);

/// Status and body of a response that did arrive.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one trip request and reports either a response or its absence.
#[async_trait]
pub trait TripTransport: Send + Sync {
    async fn post_trip(&self, request: &TripRequest) -> Result<RawResponse, TransportError>;
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// HTTP transport using `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!("{}{}", base_url.trim_end_matches('/'), CALCULATE_TRIP_PATH);
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TripTransport for HttpTransport {
    async fn post_trip(&self, request: &TripRequest) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        // Losing the body after the status line still counts as a response
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!(status, "failed to read response body: {e}");
                Vec::new()
            }
        };

        Ok(RawResponse { status, body })
    }
}

/// Bounded exponential backoff for connectivity failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one; 0 behaves like 1
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed 0-indexed `attempt`: `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Classify a response that arrived.
///
/// Pure function of the status and body; never retried by the caller.
pub fn classify_response(response: &RawResponse) -> Result<TripResponse, TripError> {
    if response.is_success() {
        return Ok(serde_json::from_slice(&response.body)?);
    }

    let detail = serde_json::from_slice::<Value>(&response.body).ok();
    match detail {
        Some(Value::Object(fields)) => {
            if let Some(message) = fields.get("error").and_then(single_error_message) {
                return Err(TripError::Validation(message));
            }
            let message = fields
                .iter()
                .map(|(field, value)| format!("{field}: {}", describe_value(value)))
                .collect::<Vec<_>>()
                .join("; ");
            if message.is_empty() {
                Err(TripError::Validation("Validation error".to_string()))
            } else {
                Err(TripError::Validation(message))
            }
        }
        _ => Err(TripError::Server {
            status: response.status,
        }),
    }
}

/// The `error` field counts only when it carries something to show.
fn single_error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(describe_value(other)),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(describe_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Resilient client for the trip-computation service.
pub struct TripClient<T = HttpTransport, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl TripClient<HttpTransport, TokioSleeper> {
    /// Client for the configured endpoint with the tokio timer.
    pub fn from_config(config: &crate::config::Config) -> Result<Self, reqwest::Error> {
        let transport = HttpTransport::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        )?;
        Ok(Self::new(transport, TokioSleeper, config.retry))
    }
}

impl<T: TripTransport, S: Sleeper> TripClient<T, S> {
    pub fn new(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Calculate a trip using the configured number of attempts.
    pub async fn calculate_trip(&self, request: &TripRequest) -> Result<TripResponse, TripError> {
        self.calculate_trip_with_attempts(request, self.policy.attempts())
            .await
    }

    /// Calculate a trip, retrying only connectivity failures, at most `max_attempts` times.
    pub async fn calculate_trip_with_attempts(
        &self,
        request: &TripRequest,
        max_attempts: u32,
    ) -> Result<TripResponse, TripError> {
        let problems = request.validate();
        if !problems.is_empty() {
            return Err(TripError::InvalidRequest(problems));
        }

        let max_attempts = max_attempts.max(1);
        for attempt in 0..max_attempts {
            debug!(attempt = attempt + 1, max_attempts, "sending trip request");

            match self.transport.post_trip(request).await {
                Ok(response) => {
                    let result = classify_response(&response);
                    match &result {
                        Ok(trip) => info!(
                            status = response.status,
                            events = trip.timeline.len(),
                            sheets = trip.log_sheets.len(),
                            "trip calculated"
                        ),
                        Err(e) => warn!(status = response.status, "trip request rejected: {e}"),
                    }
                    return result;
                }
                Err(e) if attempt + 1 < max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{e}, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, max_attempts, "{e}, giving up");
                }
            }
        }

        Err(TripError::Connectivity {
            attempts: max_attempts,
        })
    }
}
