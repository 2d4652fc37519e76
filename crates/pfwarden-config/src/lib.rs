//! Shared configuration for pfwarden tools.
//!
//! TOML profiles, credential resolution (keyring + env + plaintext),
//! and translation to `pfwarden_api::ClientOptions`. The CLI layers its
//! flag overrides on top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pfwarden_api::options::{DEFAULT_TIMEOUT, DEFAULT_URL, DEFAULT_USERNAME};
use pfwarden_api::{ClientOptions, Credentials, RetryPolicy, TlsMode};

/// Service name under which passwords are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "pfwarden";

/// Prefix for environment overrides. Nested keys are separated by `__`,
/// e.g. `PFWARDEN_PROFILES__HOME__URL`.
pub const ENV_PREFIX: &str = "PFWARDEN_";

const USERNAME_ENV: &str = "PFWARDEN_USERNAME";
const PASSWORD_ENV: &str = "PFWARDEN_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named console profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: `requested`, else the configured default.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| {
            let mut names: Vec<_> = self.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            ConfigError::ProfileNotFound {
                name: name.into(),
                available: if names.is_empty() {
                    "none".into()
                } else {
                    names.join(", ")
                },
            }
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Fallback for profiles that leave `insecure` unset.
    #[serde(default)]
    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: None,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_url() -> String {
    DEFAULT_URL.into()
}

/// A named console profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Profile {
    /// Console base URL (e.g., "https://192.168.1.1").
    #[serde(default = "default_url")]
    pub url: String,

    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Accept self-signed or otherwise invalid certificates.
    pub insecure: Option<bool>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    pub retry_min_wait_ms: Option<u64>,
    pub retry_max_wait_ms: Option<u64>,
    pub max_attempts: Option<u32>,

    /// Serialize writes across all resource categories (default on).
    pub serialize_all_writes: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pfwarden", "pfwarden").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pfwarden");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `PFWARDEN_` env vars.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

/// Username from the profile, else `PFWARDEN_USERNAME`, else `admin`.
pub fn resolve_username(profile: &Profile) -> String {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .unwrap_or_else(|| DEFAULT_USERNAME.into())
}

/// Resolve the password: keyring, then env var, then plaintext config.
///
/// The env var is the profile's `password_env` when set, `PFWARDEN_PASSWORD`
/// otherwise.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. System keyring
    if let Ok(pw) = keyring_entry(profile_name).and_then(|entry| entry.get_password()) {
        return Ok(SecretString::from(pw));
    }

    // 2. Env var
    let env_name = profile.password_env.as_deref().unwrap_or(PASSWORD_ENV);
    if let Ok(pw) = std::env::var(env_name) {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// TLS mode for a profile: a custom CA wins, then an explicit
/// `insecure = false` (profile, else defaults) selects the system roots. Appliances ship with a
/// self-signed certificate, so anything else accepts invalid certificates.
pub fn resolve_tls(profile: &Profile, defaults: &Defaults) -> TlsMode {
    if let Some(ref ca_path) = profile.ca_cert {
        return TlsMode::CustomCa(ca_path.clone());
    }
    match profile.insecure.or(defaults.insecure) {
        Some(false) => TlsMode::System,
        _ => TlsMode::DangerAcceptInvalid,
    }
}

/// Retry tuning for a profile, falling back to the client defaults.
pub fn resolve_retry(profile: &Profile) -> Result<RetryPolicy, ConfigError> {
    let defaults = RetryPolicy::default();
    let policy = RetryPolicy {
        min_wait: profile
            .retry_min_wait_ms
            .map_or(defaults.min_wait, Duration::from_millis),
        max_wait: profile
            .retry_max_wait_ms
            .map_or(defaults.max_wait, Duration::from_millis),
        max_attempts: profile.max_attempts.unwrap_or(defaults.max_attempts),
    };
    policy.validate().map_err(|e| ConfigError::Validation {
        field: "retry".into(),
        reason: e.to_string(),
    })?;
    Ok(policy)
}

/// Build `ClientOptions` from a profile. No CLI flag overrides.
pub fn profile_to_client_options(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientOptions, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let credentials = Credentials::new(
        resolve_username(profile),
        resolve_password(profile, profile_name)?,
    );
    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(ClientOptions::new(url, credentials)
        .with_tls(resolve_tls(profile, defaults))
        .with_timeout(timeout)
        .with_retry(resolve_retry(profile)?)
        .with_serialize_all_writes(profile.serialize_all_writes.unwrap_or(true)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.output, "table");
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn loads_profiles_from_toml() {
        let file = write_config(
            r#"
default_profile = "home"

[profiles.home]
url = "https://10.0.0.1"
username = "ops"
password = "hunter2"
max_attempts = 5
serialize_all_writes = false
"#,
        );
        let config = load_config_from(file.path()).unwrap();
        let home = config.profile("home").unwrap();

        assert_eq!(config.profile_name(None), "home");
        assert_eq!(home.url, "https://10.0.0.1");
        assert_eq!(home.max_attempts, Some(5));
        assert_eq!(home.serialize_all_writes, Some(false));
    }

    #[test]
    fn profile_url_defaults_to_appliance_address() {
        let file = write_config("[profiles.lab]\nusername = \"admin\"\n");
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.profile("lab").unwrap().url, DEFAULT_URL);
    }

    #[test]
    fn unknown_profile_lists_alternatives() {
        let file = write_config("[profiles.b]\n[profiles.a]\n");
        let config = load_config_from(file.path()).unwrap();

        let err = config.profile("c").unwrap_err();
        assert_eq!(err.to_string(), "profile 'c' not found (available: a, b)");
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                url: "https://192.168.1.1".into(),
                username: Some("admin".into()),
                timeout: Some(10),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"], config.profiles["default"]);
    }

    #[test]
    fn plaintext_password_is_the_last_resort() {
        let profile = Profile {
            password: Some("hunter2".into()),
            password_env: Some("PFWARDEN_TEST_UNSET_PASSWORD_VAR".into()),
            ..Profile::default()
        };
        let secret = resolve_password(&profile, "pfwarden-test-no-such-profile").unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
    }

    #[test]
    fn tls_prefers_custom_ca() {
        let defaults = Defaults::default();
        let with_ca = Profile {
            ca_cert: Some("/etc/pfwarden/ca.pem".into()),
            insecure: Some(true),
            ..Profile::default()
        };
        let strict = Profile {
            insecure: Some(false),
            ..Profile::default()
        };

        assert_eq!(
            resolve_tls(&with_ca, &defaults),
            TlsMode::CustomCa("/etc/pfwarden/ca.pem".into())
        );
        assert_eq!(resolve_tls(&strict, &defaults), TlsMode::System);
        assert_eq!(
            resolve_tls(&Profile::default(), &defaults),
            TlsMode::DangerAcceptInvalid
        );
    }

    #[test]
    fn retry_settings_are_validated() {
        let bad = Profile {
            retry_min_wait_ms: Some(5_000),
            retry_max_wait_ms: Some(100),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_retry(&bad),
            Err(ConfigError::Validation { .. })
        ));

        let tuned = Profile {
            retry_min_wait_ms: Some(10),
            retry_max_wait_ms: Some(20),
            max_attempts: Some(1),
            ..Profile::default()
        };
        let policy = resolve_retry(&tuned).unwrap();
        assert_eq!(policy.min_wait, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
    }
}
