//! Profile resolution with CLI flag overrides.
//!
//! This is the single boundary where flags and TOML profiles combine
//! into a core `EngineConfig`.

use secrecy::SecretString;

use kilosync_config::{Config, Profile};
use kilosync_core::{DeviceModel, EngineConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build the engine configuration from the config file, the active
/// profile, and global flags (flags win).
pub fn resolve_engine_config(global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    let cfg = kilosync_config::load_config_or_default();
    resolve_with(&cfg, global)
}

fn resolve_with(cfg: &Config, global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    let profile_name = cfg.active_profile_name(global.profile.as_deref());

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly named profile must exist.
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        None if global.address.is_none() => {
            return Err(CliError::NoConfig {
                path: kilosync_config::config_path().display().to_string(),
            });
        }
        None => Profile::default(),
    };

    let profile = apply_overrides(base, global);

    let password = match global.password.as_deref() {
        Some(pw) if !pw.is_empty() => Some(SecretString::from(pw.to_owned())),
        _ if profile.user.is_some() => kilosync_config::resolve_password(&profile, &profile_name),
        _ => None,
    };

    Ok(kilosync_config::profile_to_engine_config_with(
        &profile,
        &profile_name,
        &cfg.defaults,
        password,
    )?)
}

/// Overlay global flags onto a profile.
pub fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref address) = global.address {
        profile.address.clone_from(address);
    }
    if let Some(model) = global.model {
        profile.device_model = DeviceModel::from(model).as_str().to_owned();
    }
    if let Some(ref user) = global.user {
        profile.user = Some(user.clone());
    }
    if global.use_auth {
        profile.use_auth = true;
    }
    if let Some(interface) = global.interface {
        let interface = kilosync_core::VideoInterface::from(interface);
        profile.interface = Some(interface.as_str().to_owned());
    }
    if let Some(interval) = global.interval {
        profile.interval_ms = Some(interval);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout_secs = Some(timeout);
    }
    profile
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
