// Form writer
//
// Mutations are plain URL-encoded form posts, exactly what the browser
// would send. The current anti-forgery token is injected here, and edits and
// deletes carry the record's position index as `id` in both the query
// string and the body.

use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::client::Client;
use crate::error::Error;
use crate::executor::RawResponse;
use crate::scrape;

/// Field that carries a record's position index on edit and delete.
pub const POSITION_FIELD: &str = "id";

/// An ordered list of form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Append `name=yes` when `on`, nothing otherwise (HTML checkbox semantics).
    pub fn checkbox(mut self, name: impl Into<String>, on: bool) -> Self {
        if on {
            self.push(name, "yes");
        }
        self
    }

    /// Append a field holding `value`, or an empty one when `None`.
    pub fn optional(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        self.field(name, value)
    }

    /// Append `{prefix}{i}` for each value, as the console's repeatable rows expect.
    pub fn indexed<I, V>(mut self, prefix: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for (i, value) in values.into_iter().enumerate() {
            self.push(format!("{prefix}{i}"), value.to_string());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.fields
    }
}

/// An administrative page, with any fixed query parameters it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
}

impl Page {
    pub fn new(path: &'static str) -> Self {
        Self {
            path,
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    /// Absolute URL of this page, with `id` appended when a position is given.
    pub fn url(&self, base: &Url, position: Option<usize>) -> Result<Url, Error> {
        let mut url = base.join(self.path)?;
        if !self.query.is_empty() || position.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
            if let Some(index) = position {
                pairs.append_pair(POSITION_FIELD, &index.to_string());
            }
        }
        Ok(url)
    }
}

impl Client {
    /// Post `form` to `page` the way the browser would.
    ///
    /// `position` is the record's current index for edits and deletes and
    /// `None` for creates. The response is checked, in order, for a lost
    /// session, a fresh anti-forgery token, and an input-errors box.
    pub async fn submit(
        &self,
        page: &Page,
        form: Form,
        position: Option<usize>,
    ) -> Result<RawResponse, Error> {
        let token = self.session().require_token()?;
        let url = page.url(self.base_url(), position)?;

        let mut fields = Vec::with_capacity(form.len() + 2);
        fields.push((token.name, token.value));
        fields.extend(form.into_pairs());
        if let Some(index) = position {
            fields.push((POSITION_FIELD.to_owned(), index.to_string()));
        }

        debug!(path = page.path, ?position, "submitting form");
        let resp = self.execute(Method::POST, url, Some(&fields)).await?;
        self.accept_page(&resp)?;

        let messages = scrape_validation_errors(&resp);
        if messages.is_empty() {
            Ok(resp)
        } else {
            debug!(path = page.path, count = messages.len(), "console rejected form");
            Err(Error::ServerValidation { messages })
        }
    }

    /// Check a rendered page for a lost session and take its token.
    pub(crate) fn accept_page(&self, resp: &RawResponse) -> Result<(), Error> {
        if let Some(reason) = scrape::auth_rejection(&resp.body) {
            self.session().set_authenticated(false);
            return Err(Error::Authentication {
                message: reason.into(),
            });
        }
        self.session().refresh(&resp.body)
    }
}

/// Field-level validation messages the console rendered into `resp`.
pub fn scrape_validation_errors(resp: &RawResponse) -> Vec<String> {
    scrape::validation_errors(&resp.body)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn builds_repeatable_rows() {
        let form = Form::new()
            .field("name", "web_servers")
            .indexed("address", ["10.0.0.1", "10.0.0.2"])
            .checkbox("disabled", false)
            .checkbox("forward_tls_upstream", true);

        assert_eq!(form.get("address0"), Some("10.0.0.1"));
        assert_eq!(form.get("address1"), Some("10.0.0.2"));
        assert_eq!(form.get("disabled"), None);
        assert_eq!(form.get("forward_tls_upstream"), Some("yes"));
        assert_eq!(form.len(), 4);
    }

    #[test]
    fn optional_fields_are_sent_empty() {
        let form = Form::new().optional("gateway", None::<String>);
        assert_eq!(form.get("gateway"), Some(""));
    }

    #[test]
    fn page_url_appends_position() {
        let base = Url::parse("https://192.168.1.1").unwrap();
        let page = Page::new("/services_dhcp_edit.php").with_query("if", "lan");

        let create = page.url(&base, None).unwrap();
        assert_eq!(create.as_str(), "https://192.168.1.1/services_dhcp_edit.php?if=lan");

        let edit = page.url(&base, Some(3)).unwrap();
        assert_eq!(
            edit.as_str(),
            "https://192.168.1.1/services_dhcp_edit.php?if=lan&id=3"
        );
    }

    #[test]
    fn page_url_without_query_has_none() {
        let base = Url::parse("https://192.168.1.1/").unwrap();
        let url = Page::new("/firewall_aliases_edit.php").url(&base, None).unwrap();
        assert_eq!(url.query(), None);
    }
}
