// Client construction options
//
// Everything the client needs before its first request: where the console
// lives, who to log in as, TLS, and the retry and locking tuning knobs.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;
use crate::transport::TlsMode;

pub const DEFAULT_URL: &str = "https://192.168.1.1";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_MIN_WAIT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX_WAIT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Login credentials for the web console.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Linear backoff with jitter.
///
/// Retry `n` (1-based, counting the attempt that just failed) waits
/// `n * (min_wait + jitter * (max_wait - min_wait))` with `jitter` in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_wait: Duration,
    pub max_wait: Duration,
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_wait: DEFAULT_RETRY_MIN_WAIT,
            max_wait: DEFAULT_RETRY_MAX_WAIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn no_retry() -> Self {
        Self {
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            max_attempts: 1,
        }
    }

    /// Delay to wait after `attempt` failed, for a jitter sample in `[0, 1)`.
    pub fn delay_for_attempt(&self, attempt: u32, jitter: f64) -> Duration {
        let span = self.max_wait.saturating_sub(self.min_wait);
        let base = self.min_wait + span.mul_f64(jitter.clamp(0.0, 1.0));
        base.saturating_mul(attempt)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_attempts == 0 {
            return Err(Error::invalid("max_attempts", "must be at least 1"));
        }
        if self.min_wait > self.max_wait {
            return Err(Error::invalid(
                "retry_min_wait",
                format!(
                    "{} is longer than retry_max_wait ({})",
                    humantime::format_duration(self.min_wait),
                    humantime::format_duration(self.max_wait)
                ),
            ));
        }
        Ok(())
    }
}

/// Options for [`Client::new`](crate::Client::new). Immutable once the client exists.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Console root, e.g. `https://192.168.1.1`.
    pub url: Url,
    pub credentials: Credentials,
    pub tls: TlsMode,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Take the process-wide write lock around every mutation.
    ///
    /// Aliases of every kind share one ordered list on the appliance, so a
    /// write in one category can renumber the position indices another
    /// in-flight write relies on. Turning this off trades that guarantee
    /// for parallel writes across categories.
    pub serialize_all_writes: bool,
}

impl ClientOptions {
    pub fn new(url: Url, credentials: Credentials) -> Self {
        Self {
            url,
            credentials,
            tls: TlsMode::default(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            serialize_all_writes: true,
        }
    }

    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_serialize_all_writes(mut self, enabled: bool) -> Self {
        self.serialize_all_writes = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self.url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::invalid(
                    "url",
                    format!("unsupported scheme '{other}', expected http or https"),
                ));
            }
        }
        if self.credentials.username.is_empty() {
            return Err(Error::invalid("username", "must not be empty"));
        }
        self.retry.validate()
    }
}
