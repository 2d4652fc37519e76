// Config reader
//
// The console has no read API. It does have a diagnostic page that runs an
// arbitrary script and echoes the output into a `<pre>` block, so config
// subtrees are read by asking it to print them as JSON.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::client::Client;
use crate::coordinator::LockCategory;
use crate::error::{Error, Operation};
use crate::form::{Form, Page};
use crate::scrape;

const SCRIPT_PAGE: &str = "/diag_command.php";
const SCRIPT_RESOURCE: &str = "script execution";

static CONFIG_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_/-]+$").expect("config path pattern is valid"));

/// Check that `path` can be spliced into the read script unquoted.
pub fn validate_config_path(path: &str) -> Result<(), Error> {
    if CONFIG_PATH.is_match(path) && !path.starts_with('/') && !path.ends_with('/') {
        Ok(())
    } else {
        Err(Error::invalid(
            "config path",
            format!("'{path}' must be slash-separated segments of letters, digits, '_' or '-'"),
        ))
    }
}

impl Client {
    /// Read the config subtree at `path` (for example `unbound/hosts`).
    ///
    /// An absent path reads as JSON `null`. No lock is taken; resource
    /// operations take their own.
    pub async fn read_subtree(&self, path: &str) -> Result<Value, Error> {
        validate_config_path(path)?;
        let command = format!("print(json_encode(config_get_path('{path}')));");

        let output = self.run_script(&command).await?;
        let value = serde_json::from_str(output.trim())
            .map_err(|e| Error::parse(format!("config at '{path}' is not valid JSON: {e}")))?;
        trace!(path, "config subtree read");
        Ok(value)
    }

    /// Run a script on the console and decode its output as JSON.
    ///
    /// `hint` picks the lock discipline on the script category (shared for
    /// [`Operation::Get`], exclusive otherwise) and the error wrapper.
    /// Empty output decodes as `null`.
    pub async fn execute_script(&self, command: &str, hint: Operation) -> Result<Value, Error> {
        let result = async {
            if hint.is_write() {
                let _guard = self.write_lock(&[LockCategory::ScriptExecution]).await?;
                self.script_value(command).await
            } else {
                let _guard = self.read_lock(LockCategory::ScriptExecution).await?;
                self.script_value(command).await
            }
        }
        .await;
        result.map_err(|e| Error::operation(hint, SCRIPT_RESOURCE, e))
    }

    async fn script_value(&self, command: &str) -> Result<Value, Error> {
        let output = self.run_script(command).await?;
        let output = output.trim();
        if output.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(output)
            .map_err(|e| Error::parse(format!("script output is not valid JSON: {e}")))
    }

    /// Post `command` to the script console and return what it printed.
    pub(crate) async fn run_script(&self, command: &str) -> Result<String, Error> {
        let form = Form::new()
            .field("txtPHPCommand", command)
            .field("submit", "EXECPHP");
        let resp = self.submit(&Page::new(SCRIPT_PAGE), form, None).await?;

        let output = scrape::script_output(&resp.body)?;
        if let Some(marker) = scrape::script_error(&output) {
            debug!(marker, "script console reported an error");
            return Err(Error::ScriptFailed {
                output: output.trim().to_owned(),
            });
        }
        Ok(output)
    }
}
