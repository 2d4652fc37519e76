//! CLI configuration: a thin wrapper around `pfwarden_config` shared types.
//!
//! Re-exports the shared types and layers `GlobalOpts` flag overrides
//! (--url, --username, --insecure, --timeout) on top of the profile.

use std::time::Duration;

use pfwarden_api::{ClientOptions, TlsMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use pfwarden_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Build `ClientOptions` from the config file, profile, and CLI overrides.
///
/// Without a matching profile the flags and `PFWARDEN_*` env vars must supply
/// the URL and password on their own.
pub fn client_options(global: &GlobalOpts) -> Result<(String, ClientOptions), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profile(&profile_name) {
        Ok(profile) => profile.clone(),
        Err(_) if global.url.is_some() => Profile::default(),
        Err(err) if global.profile.is_some() => return Err(err.into()),
        Err(_) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    let options = resolve_profile(&apply_overrides(profile, global), &profile_name, &cfg.defaults)?;
    Ok((profile_name, apply_insecure_flag(options, global)))
}

/// Fold flag values into a copy of the profile (flag > env > profile).
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

/// Translate a `Profile` + global flags into `ClientOptions`.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientOptions, CliError> {
    let options = pfwarden_config::profile_to_client_options(profile, profile_name, defaults)?;
    Ok(options)
}

/// `--insecure` wins over every profile TLS setting.
fn apply_insecure_flag(options: ClientOptions, global: &GlobalOpts) -> ClientOptions {
    if global.insecure {
        options.with_tls(TlsMode::DangerAcceptInvalid)
    } else {
        options
    }
}

/// Timeout as shown in `config show`.
pub fn describe_timeout(seconds: u64) -> String {
    humantime::format_duration(Duration::from_secs(seconds)).to_string()
}
