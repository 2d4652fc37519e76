// Console client
//
// `Client` is a cheap handle over one authenticated browser-like session:
// the cookie jar, the anti-forgery token and the lock matrix all live in a
// shared inner struct, so clones cooperate and separately built clients
// never interfere. Resource, config and apply operations are inherent
// methods implemented in their own modules.

use std::sync::Arc;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::coordinator::{Coordinator, LockCategory, ReadGuard, WriteGuard};
use crate::error::Error;
use crate::executor::{RawResponse, RequestExecutor};
use crate::options::ClientOptions;
use crate::session::Session;
use crate::transport::TransportConfig;

#[derive(Debug)]
struct ClientInner {
    options: ClientOptions,
    executor: RequestExecutor,
    session: Session,
    coordinator: Coordinator,
}

/// Handle to one web console session.
///
/// Cloning is cheap and clones share the session and locks. Every clone
/// carries a [`CancellationToken`]; cancelling it aborts in-flight requests,
/// backoff waits and lock waits of operations started through that handle.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    cancel: CancellationToken,
}

impl Client {
    /// Build a client without contacting the console.
    ///
    /// Call [`login`](Self::login) before anything else, or use
    /// [`connect`](Self::connect) which does both.
    pub fn new(options: ClientOptions) -> Result<Self, Error> {
        options.validate()?;

        let transport = TransportConfig {
            tls: options.tls.clone(),
            timeout: options.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar();
        let http = transport.build_client()?;

        debug!(
            url = %options.url,
            serialize_all_writes = options.serialize_all_writes,
            max_attempts = options.retry.max_attempts,
            "client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                executor: RequestExecutor::new(http, options.retry),
                session: Session::new(),
                coordinator: Coordinator::new(options.serialize_all_writes),
                options,
            }),
            cancel: CancellationToken::new(),
        })
    }

    /// Build a client and log in.
    pub async fn connect(options: ClientOptions) -> Result<Self, Error> {
        let client = Self::new(options)?;
        client.login().await?;
        Ok(client)
    }

    /// A handle sharing this session but cancelled by `token`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: token,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Console root URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.options.url
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.inner.coordinator
    }

    /// Returns `true` once a login succeeded and no page has since shown the
    /// session to be gone.
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn execute(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(String, String)]>,
    ) -> Result<RawResponse, Error> {
        let result = self
            .inner
            .executor
            .execute(method, url, form, &self.cancel)
            .await;
        if matches!(result, Err(Error::Authentication { .. })) {
            self.inner.session.set_authenticated(false);
        }
        result
    }

    pub(crate) async fn read_lock(&self, category: LockCategory) -> Result<ReadGuard<'_>, Error> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            guard = self.inner.coordinator.acquire_read(category) => Ok(guard),
        }
    }

    pub(crate) async fn write_lock(
        &self,
        categories: &[LockCategory],
    ) -> Result<WriteGuard<'_>, Error> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            guard = self.inner.coordinator.acquire_write_many(categories) => Ok(guard),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use secrecy::SecretString;

    use super::*;
    use crate::options::Credentials;

    fn options(url: &str) -> ClientOptions {
        ClientOptions::new(
            Url::parse(url).unwrap(),
            Credentials::new("admin", SecretString::from("pfsense".to_string())),
        )
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = Client::new(options("ftp://192.168.1.1")).unwrap_err();
        assert!(matches!(err, Error::ClientValidation { ref field, .. } if field == "url"));
    }

    #[test]
    fn starts_logged_out() {
        let client = Client::new(options("https://192.168.1.1")).unwrap();
        assert!(!client.is_authenticated());
        assert!(client.session().current_token().is_none());
    }

    #[test]
    fn clones_share_state_but_not_cancellation() {
        let client = Client::new(options("https://192.168.1.1")).unwrap();
        let scoped = client.with_cancellation(CancellationToken::new());

        scoped.cancellation_token().cancel();
        assert!(!client.cancellation_token().is_cancelled());
        assert!(std::ptr::eq(client.session(), scoped.session()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_handle_gives_up_waiting_for_locks() {
        let client = Client::new(options("https://192.168.1.1")).unwrap();
        let _held = client.write_lock(&[LockCategory::Aliases]).await.unwrap();

        let cancel = CancellationToken::new();
        let waiter = client.with_cancellation(cancel.clone());
        cancel.cancel();

        let result = waiter.write_lock(&[LockCategory::Aliases]).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
