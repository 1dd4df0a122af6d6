//! CLI-side configuration: profile selection and flag overrides on top of
//! the shared `crossfilter-config` crate.

use crossfilter_config::{Config, Profile, profile_to_configs};
use crossfilter_core::{ControllerConfig, GatewayConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// Re-export the shared config surface so commands can use `crate::config::*`.
pub use crossfilter_config::{config_path, load_config, save_config_to};

/// The profile name to use: `--profile` flag, else the config's default.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve the active profile and apply CLI flag overrides.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<Profile, CliError> {
    let (_, mut profile) = config
        .resolve_profile(global.profile.as_deref())
        .map_err(|_| {
            let mut names: Vec<_> = config.profiles.keys().cloned().collect();
            names.sort();
            CliError::ProfileNotFound {
                name: active_profile_name(global, config),
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            }
        })?;

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok(profile)
}

/// Build the core configs from the config file, profile, and CLI overrides.
pub fn build_configs(global: &GlobalOpts) -> Result<(GatewayConfig, ControllerConfig), CliError> {
    let cfg = load_config()?;
    let profile = resolve_profile(global, &cfg)?;
    tracing::debug!(
        profile = %active_profile_name(global, &cfg),
        api_url = %profile.api_url,
        "resolved profile"
    );
    Ok(profile_to_configs(&profile, &cfg.defaults)?)
}
