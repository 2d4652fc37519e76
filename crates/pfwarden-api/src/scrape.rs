// Console markup scraping
//
// The console was never meant to be driven by a program, so the handful of
// markup conventions we rely on are collected here: the head-script that
// carries the anti-forgery token, the input-errors box, the `<pre>` block
// the script console echoes into, and the pages that signal a lost session.
// If the appliance changes its templates, this is the file to update.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::Error;
use crate::session::CsrfToken;

/// Body text the login page shows after a rejected username/password.
pub const LOGIN_FAILURE_PHRASE: &str = "Username or Password incorrect";

/// Body text csrf-magic renders when a post carried a stale token.
const CSRF_FAILURE_PHRASE: &str = "CSRF check failed";

/// Marker of the login form, which the console serves in place of any page
/// once the session is gone.
const LOGIN_FORM_MARKER: &str = "name=\"usernamefld\"";

/// Line prefixes PHP uses when the script console hits an error.
const SCRIPT_ERROR_MARKERS: &[&str] = &["PHP ERROR", "Parse error:", "Fatal error:", "Warning:"];

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"var\s+csrfMagicToken\s*=\s*"([^"]+)";\s*var\s+csrfMagicName\s*=\s*"([^"]+)";"#)
        .expect("token pattern is valid")
});

static INPUT_ERRORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.input-errors li").expect("selector is valid"));

/// `<pre>` blocks with their contents. The console escapes what it echoes
/// there, so a closing tag inside one cannot occur.
static PRE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre\b[^>]*>.*?</pre>").expect("pre pattern is valid"));

static PRE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("pre").expect("selector is valid"));

/// Extract the anti-forgery token pair from a page's head script.
pub fn extract_token(body: &str) -> Result<CsrfToken, Error> {
    let caps = TOKEN_PATTERN
        .captures(body)
        .ok_or_else(|| Error::parse("anti-forgery token not found in page"))?;
    Ok(CsrfToken {
        value: caps[1].to_owned(),
        name: caps[2].to_owned(),
    })
}

/// Collect the messages from the console's input-errors box.
///
/// Returns an empty vector when the page has no such box.
pub fn validation_errors(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    document
        .select(&INPUT_ERRORS)
        .map(|item| collapse_whitespace(&item.text().collect::<String>()))
        .filter(|msg| !msg.is_empty())
        .collect()
}

/// Text the script console echoed into its first `<pre>` block.
pub fn script_output(body: &str) -> Result<String, Error> {
    let document = Html::parse_document(body);
    document
        .select(&PRE)
        .next()
        .map(|pre| pre.text().collect::<String>())
        .ok_or_else(|| Error::parse("script console output block not found"))
}

/// Returns the error marker that starts a line of script console output, if any.
///
/// Only line starts count: `json_encode` emits a single line, so a marker
/// inside a description string never matches.
pub fn script_error(output: &str) -> Option<&'static str> {
    output.lines().map(str::trim_start).find_map(|line| {
        SCRIPT_ERROR_MARKERS
            .iter()
            .copied()
            .find(|marker| line.starts_with(marker))
    })
}

/// Returns a reason when the page shows the session was not accepted.
///
/// Script console output is skipped: it echoes config values, and a record
/// whose description quotes one of the markers must not look like a lost
/// session.
pub fn auth_rejection(body: &str) -> Option<&'static str> {
    let chrome = PRE_BLOCK.replace_all(body, "");
    if chrome.contains(CSRF_FAILURE_PHRASE) {
        Some("anti-forgery token rejected by the console")
    } else if chrome.contains(LOGIN_FORM_MARKER) {
        Some("session expired, the console served its login page")
    } else {
        None
    }
}

/// Returns `true` if the login page reports bad credentials.
pub fn login_failed(body: &str) -> bool {
    body.contains(LOGIN_FAILURE_PHRASE)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const HEAD: &str = r#"<html><head>
        <script type="text/javascript">var csrfMagicToken = "sid:0123abcd,1700000000";var csrfMagicName = "__csrf_magic";</script>
        </head><body>"#;

    #[test]
    fn extracts_token_pair() {
        let page = format!("{HEAD}<p>dashboard</p></body></html>");
        let token = extract_token(&page).unwrap();
        assert_eq!(token.name, "__csrf_magic");
        assert_eq!(token.value, "sid:0123abcd,1700000000");
    }

    #[test]
    fn missing_token_is_a_parse_error() {
        let result = extract_token("<html><head></head><body>nothing</body></html>");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn scrapes_input_errors() {
        let page = format!(
            r#"{HEAD}<div class="alert alert-danger input-errors">
                <p>The following input errors were detected:</p>
                <ul>
                    <li>A valid IP address must be specified.</li>
                    <li>The  domain
                        field is required.</li>
                </ul>
            </div></body></html>"#
        );

        assert_eq!(
            validation_errors(&page),
            vec![
                "A valid IP address must be specified.".to_string(),
                "The domain field is required.".to_string(),
            ]
        );
    }

    #[test]
    fn no_input_errors_on_clean_page() {
        let page = format!("{HEAD}<ul><li>menu entry</li></ul></body></html>");
        assert!(validation_errors(&page).is_empty());
    }

    #[test]
    fn script_output_decodes_entities() {
        let page = format!(
            "{HEAD}<div class=\"panel-body\"><pre>[{{&quot;domain&quot;:&quot;example.com&quot;}}]</pre></div></body></html>"
        );
        assert_eq!(script_output(&page).unwrap(), r#"[{"domain":"example.com"}]"#);
    }

    #[test]
    fn script_output_requires_pre_block() {
        let page = format!("{HEAD}<p>no output</p></body></html>");
        assert!(matches!(script_output(&page), Err(Error::Parse { .. })));
    }

    #[test]
    fn detects_script_errors() {
        assert_eq!(
            script_error("PHP ERROR: Type: 1, File: /tmp/x.php, Line: 2"),
            Some("PHP ERROR")
        );
        assert_eq!(script_error("\nFatal error: Uncaught Error"), Some("Fatal error:"));
        assert_eq!(
            script_error("Warning: Undefined variable $x in /tmp/x.php on line 2"),
            Some("Warning:")
        );
        assert_eq!(script_error(r#"[{"descr":"PHP ERROR in a description"}]"#), None);
        assert_eq!(script_error(r#"{"descr":"see Fatal error: in the log"}"#), None);
    }

    #[test]
    fn detects_lost_sessions() {
        assert!(auth_rejection("<p>CSRF check failed. Your form session may have expired</p>").is_some());
        assert!(auth_rejection(r#"<input type="text" name="usernamefld" id="usernamefld">"#).is_some());
        assert!(auth_rejection("<p>All good</p>").is_none());
    }

    #[test]
    fn markers_inside_script_output_are_data() {
        let page = format!(
            "{HEAD}<div class=\"panel-body\"><pre>[{{&quot;descr&quot;:&quot;CSRF check failed&quot;}}]\nname=\"usernamefld\"</pre></div></body></html>"
        );
        assert!(auth_rejection(&page).is_none());
    }
}
