// Console authentication
//
// Form-based login exactly as the browser performs it: fetch the login page
// for a token, post the credentials with it, and keep the session cookie
// the console sets in the client's jar.

use reqwest::Method;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::scrape;

const LOGIN_PATH: &str = "/";
const LOGOUT_PATH: &str = "/index.php?logout";

impl Client {
    /// Log in with the credentials from the client options.
    ///
    /// Any failure along the way, including transport errors, is reported
    /// as [`Error::Authentication`]. Cancellation stays [`Error::Cancelled`].
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.base_url().join(LOGIN_PATH)?;
        let credentials = &self.options().credentials;
        debug!(%url, username = %credentials.username, "logging in");

        let landing = self
            .execute(Method::GET, url.clone(), None)
            .await
            .map_err(login_error)?;
        self.session().refresh(&landing.body).map_err(login_error)?;
        let token = self.session().require_token()?;

        let fields = vec![
            (token.name, token.value),
            ("usernamefld".to_owned(), credentials.username.clone()),
            (
                "passwordfld".to_owned(),
                credentials.password.expose_secret().to_owned(),
            ),
            ("login".to_owned(), "Sign In".to_owned()),
        ];

        let resp = self
            .execute(Method::POST, url, Some(&fields))
            .await
            .map_err(login_error)?;

        if scrape::login_failed(&resp.body) {
            self.session().clear();
            return Err(Error::Authentication {
                message: scrape::LOGIN_FAILURE_PHRASE.into(),
            });
        }

        self.session().refresh(&resp.body).map_err(login_error)?;
        self.session().set_authenticated(true);
        debug!(attempts = resp.attempts, "login successful");
        Ok(())
    }

    /// End the session.
    ///
    /// The local token and login flag are dropped even if the request fails.
    pub async fn logout(&self) -> Result<(), Error> {
        let Some(token) = self.session().current_token() else {
            self.session().clear();
            return Ok(());
        };

        let url = self.base_url().join(LOGOUT_PATH)?;
        debug!(%url, "logging out");

        let fields = [(token.name, token.value)];
        let result = self.execute(Method::POST, url, Some(&fields)).await;
        self.session().clear();

        result.map(|_| debug!("logout complete"))
    }
}

fn login_error(err: Error) -> Error {
    match err {
        Error::Cancelled | Error::Authentication { .. } => err,
        other => Error::Authentication {
            message: format!("login failed: {other}"),
        },
    }
}
