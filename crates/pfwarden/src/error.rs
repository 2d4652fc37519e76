//! CLI error types with miette diagnostics.
//!
//! Maps `pfwarden_api::Error` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pfwarden_api::Error as ApiError;
use pfwarden_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the console")]
    #[diagnostic(
        code(pfwarden::connection_failed),
        help(
            "Check that the console is running and reachable.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed {
        #[source]
        source: ApiError,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(pfwarden::auth_failed),
        help(
            "Verify the username and password for profile '{profile}'.\n\
             Run: pfwarden config set-password --profile {profile}"
        )
    )]
    AuthFailed {
        profile: String,
        #[source]
        source: ApiError,
    },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(pfwarden::no_credentials),
        help(
            "Configure credentials with: pfwarden config init\n\
             Or set the PFWARDEN_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(pfwarden::not_found),
        help("Run: pfwarden {list_command} to see existing records")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' was not removed")]
    #[diagnostic(
        code(pfwarden::still_exists),
        help("The console accepted the delete but the record is still listed.")
    )]
    StillExists {
        resource_type: String,
        identifier: String,
    },

    // ── Console ──────────────────────────────────────────────────────
    #[error("The console rejected the change: {}", messages.join("; "))]
    #[diagnostic(
        code(pfwarden::rejected),
        help("Fix the listed fields in the JSON file and try again.")
    )]
    Rejected { messages: Vec<String> },

    #[error(transparent)]
    #[diagnostic(
        code(pfwarden::apply_failed),
        help("The records were saved. Re-run the matching `pfwarden apply` command.")
    )]
    ApplyFailed(ApiError),

    #[error(transparent)]
    #[diagnostic(code(pfwarden::api_error))]
    Api(ApiError),

    #[error("Cancelled")]
    #[diagnostic(code(pfwarden::cancelled))]
    Cancelled,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pfwarden::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(pfwarden::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: pfwarden config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(pfwarden::no_config),
        help(
            "Create one with: pfwarden config init\n\
             Or pass --url with PFWARDEN_PASSWORD set.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(pfwarden::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(pfwarden::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::StillExists { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::Rejected { .. }
            | Self::Json(_)
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::Cancelled => exit_code::CANCELLED,
            _ => exit_code::GENERAL,
        }
    }

    /// Name the active profile in authentication failures.
    #[must_use]
    pub fn with_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { source, .. } => Self::AuthFailed {
                profile: name.into(),
                source,
            },
            other => other,
        }
    }
}

// ── Library error → CliError mapping ─────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        if matches!(err, ApiError::ApplyFailed { .. }) {
            return Self::ApplyFailed(err);
        }
        match err.root_cause() {
            ApiError::Cancelled => Self::Cancelled,
            ApiError::Authentication { .. } => Self::AuthFailed {
                profile: "current".into(),
                source: err,
            },
            ApiError::FailedRequest { .. } | ApiError::Tls(_) => {
                Self::ConnectionFailed { source: err }
            }
            ApiError::ClientValidation { field, reason } => Self::Validation {
                field: field.clone(),
                reason: reason.clone(),
            },
            ApiError::ServerValidation { messages } => Self::Rejected {
                messages: messages.clone(),
            },
            ApiError::NotFound { resource, key } => Self::NotFound {
                resource_type: (*resource).into(),
                identifier: key.clone(),
                list_command: list_command(resource).into(),
            },
            ApiError::StillExists { resource, key } => Self::StillExists {
                resource_type: (*resource).into(),
                identifier: key.clone(),
            },
            _ => Self::Api(err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                Self::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

/// The `list` subcommand that shows records of `resource`.
fn list_command(resource: &str) -> &'static str {
    match resource {
        "firewall IP alias" => "ip-aliases list",
        "firewall port alias" => "port-aliases list",
        "DNS resolver domain override" => "domain-overrides list",
        "DNS resolver host override" => "host-overrides list",
        _ => "static-mappings list",
    }
}
