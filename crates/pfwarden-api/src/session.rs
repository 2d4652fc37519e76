// Session state
//
// The cookie jar lives in the HTTP client; what we track here is the
// anti-forgery token. The console rotates it on every render, so every
// page we read replaces it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::trace;

use crate::error::Error;
use crate::scrape;

/// Anti-forgery token name/value pair, as embedded in the page head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub name: String,
    pub value: String,
}

/// Current anti-forgery token plus the login flag.
///
/// Readers never observe a half-written token: replacement happens under
/// the write half of an `RwLock`, after the new pair is fully parsed.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<CsrfToken>>,
    authenticated: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token captured from the most recent response.
    pub fn current_token(&self) -> Option<CsrfToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-extract the token from a response body and store it.
    ///
    /// A body without the token pattern is a [`Error::Parse`]: every page the
    /// console renders carries one, so its absence means we are not talking
    /// to the page we think we are.
    pub fn refresh(&self, body: &str) -> Result<(), Error> {
        let token = scrape::extract_token(body)?;
        trace!(name = %token.name, "anti-forgery token rotated");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    pub(crate) fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::Release);
    }

    /// Token for a mutating request. Fails if no page has been read yet.
    pub(crate) fn require_token(&self) -> Result<CsrfToken, Error> {
        self.current_token().ok_or_else(|| Error::Authentication {
            message: "no anti-forgery token held, log in first".into(),
        })
    }

    pub(crate) fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.set_authenticated(false);
    }
}
