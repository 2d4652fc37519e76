// Request executor
//
// Every HTTP round-trip goes through `RequestExecutor::execute`. It is the
// only place that decides whether a failure is transient: transport errors
// and 5xx (minus 501) are retried with linear jittered backoff, everything
// else is returned to the caller as-is. A non-2xx page that shows the
// session was refused becomes `Error::Authentication` rather than a failed
// request, since the console answers a stale token with 403.

use reqwest::{Method, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::options::RetryPolicy;
use crate::scrape;

/// A fully-read response from the console.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Final URL after redirects.
    pub url: Url,
    pub body: String,
    /// Number of attempts it took, starting at 1.
    pub attempts: u32,
}

/// Per-request retry bookkeeping. Dropped on success or final failure.
#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    last_error: Option<String>,
    last_status: Option<StatusCode>,
}

enum Outcome {
    Done(RawResponse),
    Retry,
    Fail,
    Rejected(&'static str),
}

/// Issues HTTP calls against the console with the configured retry policy.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send a request, retrying transient failures.
    ///
    /// `form` is URL-encoded into the body. It is re-encoded on every
    /// attempt since a sent body cannot be replayed. Cancelling `cancel`
    /// aborts the in-flight request or the backoff wait with
    /// [`Error::Cancelled`].
    pub async fn execute(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(String, String)]>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        let mut state = RetryState::default();

        loop {
            state.attempt += 1;
            debug!(%method, path = url.path(), attempt = state.attempt, "sending request");

            let mut builder = self.http.request(method.clone(), url.clone());
            if let Some(fields) = form {
                builder = builder.form(fields);
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                result = send_and_read(builder) => result,
            };

            match classify(result, &mut state) {
                Outcome::Done(mut response) => {
                    response.attempts = state.attempt;
                    return Ok(response);
                }
                Outcome::Rejected(reason) => {
                    debug!(
                        %method,
                        path = url.path(),
                        status = ?state.last_status,
                        reason,
                        "console refused the session"
                    );
                    return Err(Error::Authentication {
                        message: reason.into(),
                    });
                }
                Outcome::Retry if state.attempt < self.policy.max_attempts => {}
                Outcome::Retry | Outcome::Fail => {
                    return Err(failed(&method, &url, &state));
                }
            }

            let delay = self
                .policy
                .delay_for_attempt(state.attempt, rand::random::<f64>());
            warn!(
                %method,
                path = url.path(),
                attempt = state.attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = state.last_error.as_deref().unwrap_or_default(),
                "request failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Transport errors and 5xx except 501 are worth another attempt.
///
/// 501 means the appliance does not implement the page at all, which no
/// amount of retrying fixes.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED
}

async fn send_and_read(
    builder: reqwest::RequestBuilder,
) -> Result<(StatusCode, Url, String), reqwest::Error> {
    let resp = builder.send().await?;
    let status = resp.status();
    let url = resp.url().clone();
    let body = resp.text().await?;
    Ok((status, url, body))
}

fn classify(
    result: Result<(StatusCode, Url, String), reqwest::Error>,
    state: &mut RetryState,
) -> Outcome {
    match result {
        Ok((status, url, body)) if status.is_success() => Outcome::Done(RawResponse {
            status,
            url,
            body,
            attempts: 0,
        }),
        Ok((status, _, body)) => {
            state.last_status = Some(status);
            state.last_error = Some(format!("HTTP {status}"));
            if is_retryable_status(status) {
                Outcome::Retry
            } else if let Some(reason) = scrape::auth_rejection(&body) {
                Outcome::Rejected(reason)
            } else {
                Outcome::Fail
            }
        }
        Err(e) => {
            state.last_status = e.status();
            state.last_error = Some(e.to_string());
            // A request that could not even be built will not build next time.
            if e.is_builder() {
                Outcome::Fail
            } else {
                Outcome::Retry
            }
        }
    }
}

fn failed(method: &Method, url: &Url, state: &RetryState) -> Error {
    Error::FailedRequest {
        method: method.to_string(),
        path: url.path().to_owned(),
        attempts: state.attempt,
        status: state.last_status.map(|s| s.as_u16()),
        reason: state
            .last_error
            .clone()
            .unwrap_or_else(|| "unknown error".into()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn retries_server_errors_except_not_implemented() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::NOT_IMPLEMENTED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn failure_reports_attempts_and_status() {
        let state = RetryState {
            attempt: 3,
            last_error: Some("HTTP 503 Service Unavailable".into()),
            last_status: Some(StatusCode::SERVICE_UNAVAILABLE),
        };
        let url = Url::parse("https://192.168.1.1/diag_command.php").unwrap();

        match failed(&Method::POST, &url, &state) {
            Error::FailedRequest {
                method,
                path,
                attempts,
                status,
                ..
            } => {
                assert_eq!(method, "POST");
                assert_eq!(path, "/diag_command.php");
                assert_eq!(attempts, 3);
                assert_eq!(status, Some(503));
            }
            other => panic!("expected FailedRequest, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_rejection_page_is_not_a_plain_failure() {
        let mut state = RetryState::default();
        let url = Url::parse("https://192.168.1.1/diag_command.php").unwrap();
        let body = "<html><body><p>CSRF check failed. Your form session may have expired.</p></body></html>";

        let outcome = classify(Ok((StatusCode::FORBIDDEN, url.clone(), body.into())), &mut state);
        assert!(matches!(outcome, Outcome::Rejected(_)));

        let outcome = classify(Ok((StatusCode::FORBIDDEN, url, "Forbidden".into())), &mut state);
        assert!(matches!(outcome, Outcome::Fail));
    }
}
