use thiserror::Error;

/// Which CRUD step an error (or a script execution) belongs to.
///
/// Doubles as the lock-discipline hint for [`Client::execute_script`]:
/// `Get` takes a shared lock, everything else an exclusive one.
///
/// [`Client::execute_script`]: crate::Client::execute_script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Returns `true` for operations that mutate the remote store.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// Top-level error type for the `pfwarden-api` crate.
///
/// Leaf variants describe a single failure; the `*OperationFailed` and
/// `ApplyFailed` variants wrap a leaf with the resource it happened on.
/// Use [`root_cause`](Self::root_cause) to classify a wrapped error.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed, the session expired, or the anti-forgery token was rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Validation ──────────────────────────────────────────────────
    /// A caller-supplied value cannot be encoded. Raised before any request.
    #[error("Invalid {field}: {reason}")]
    ClientValidation { field: String, reason: String },

    /// The console rejected the submitted form.
    #[error("Rejected by the console: {}", messages.join("; "))]
    ServerValidation { messages: Vec<String> },

    // ── Lookup ──────────────────────────────────────────────────────
    #[error("{resource} '{key}' not found")]
    NotFound { resource: &'static str, key: String },

    #[error("{resource} '{key}' still exists after delete")]
    StillExists { resource: &'static str, key: String },

    // ── Data ────────────────────────────────────────────────────────
    /// HTML or JSON did not have the expected shape.
    #[error("Unexpected response: {message}")]
    Parse { message: String },

    /// The diagnostic script console reported an error instead of output.
    #[error("Server-side script failed: {output}")]
    ScriptFailed { output: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Network failure or non-success status after the retry budget was spent.
    #[error("{method} {path} failed after {attempts} attempt(s): {reason}")]
    FailedRequest {
        method: String,
        path: String,
        attempts: u32,
        status: Option<u16>,
        reason: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("TLS error: {0}")]
    Tls(String),

    // ── Operation wrappers ──────────────────────────────────────────
    #[error("Failed to read {resource}")]
    GetOperationFailed {
        resource: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to create {resource}")]
    CreateOperationFailed {
        resource: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to update {resource}")]
    UpdateOperationFailed {
        resource: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to delete {resource}")]
    DeleteOperationFailed {
        resource: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The activation step failed. The preceding writes may still have landed.
    #[error("Failed to apply {scope} changes")]
    ApplyFailed {
        scope: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap `source` in the operation-failed variant matching `op`.
    pub fn operation(op: Operation, resource: &'static str, source: Error) -> Self {
        let source = Box::new(source);
        match op {
            Operation::Get => Self::GetOperationFailed { resource, source },
            Operation::Create => Self::CreateOperationFailed { resource, source },
            Operation::Update => Self::UpdateOperationFailed { resource, source },
            Operation::Delete => Self::DeleteOperationFailed { resource, source },
        }
    }

    /// The operation this error was raised from, if it is a wrapper.
    pub fn operation_kind(&self) -> Option<Operation> {
        match self {
            Self::GetOperationFailed { .. } => Some(Operation::Get),
            Self::CreateOperationFailed { .. } => Some(Operation::Create),
            Self::UpdateOperationFailed { .. } => Some(Operation::Update),
            Self::DeleteOperationFailed { .. } => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Strip every wrapper and return the leaf error.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::GetOperationFailed { source, .. }
            | Self::CreateOperationFailed { source, .. }
            | Self::UpdateOperationFailed { source, .. }
            | Self::DeleteOperationFailed { source, .. }
            | Self::ApplyFailed { source, .. } => source.root_cause(),
            _ => self,
        }
    }

    /// Returns `true` if the natural key was absent from the current list.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::NotFound { .. })
    }

    /// Returns `true` if re-authenticating might resolve the error.
    pub fn is_auth(&self) -> bool {
        matches!(self.root_cause(), Self::Authentication { .. })
    }

    /// Returns `true` if the caller's input was at fault (locally or remotely).
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::ClientValidation { .. } | Self::ServerValidation { .. }
        )
    }

    /// Returns `true` if the remote system could not be reached reliably.
    pub fn is_unreachable(&self) -> bool {
        matches!(self.root_cause(), Self::FailedRequest { .. })
    }

    /// Returns `true` if the leaf error is one the executor would retry.
    ///
    /// Only meaningful on errors that escaped the retry loop early, such as
    /// a non-retryable status reported by a single-attempt policy.
    pub fn is_retryable(&self) -> bool {
        match self.root_cause() {
            Self::FailedRequest { status: None, .. } => true,
            Self::FailedRequest {
                status: Some(code), ..
            } => *code >= 500 && *code != 501,
            _ => false,
        }
    }

    /// Field-level messages from a server-side validation failure.
    pub fn validation_messages(&self) -> &[String] {
        match self.root_cause() {
            Self::ServerValidation { messages } => messages,
            _ => &[],
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClientValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
