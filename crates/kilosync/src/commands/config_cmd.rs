//! Config subcommand handlers.

use std::io::BufRead;

use secrecy::SecretString;

use kilosync_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{apply_overrides, available_profiles};
use crate::error::CliError;
use crate::output;

const MASK: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: profile from global flags ─────────────────────────
        ConfigCommand::Init { name } => {
            let mut cfg = config::load_config_or_default();
            let profile = apply_overrides(Profile::default(), global);

            // Validate before writing anything.
            config::profile_to_engine_config_with(
                &profile,
                &name,
                &cfg.defaults,
                global.password.clone().map(SecretString::from),
            )?;

            if let Some(ref password) = global.password {
                config::store_password(&name, &SecretString::from(password.clone()))?;
                eprintln!("✓ Password stored in system keyring");
            }

            cfg.profiles.insert(name.clone(), profile);
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            let path = config::save_config(&cfg)?;

            eprintln!("✓ Profile '{name}' written to {}", path.display());
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = masked(config::load_config_or_default());
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.default_profile.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = cfg.active_profile_name(global.profile.as_deref());
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: kilosync --address <ip> config init");
            } else {
                for (name, profile) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}\t{}", profile.address, profile.device_model);
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name =
                profile.unwrap_or_else(|| cfg.active_profile_name(global.profile.as_deref()));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let secret = line.trim_end_matches(['\r', '\n']);
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            config::store_password(&profile_name, &SecretString::from(secret.to_owned()))?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    let number = |field: &str, value: &str| {
        value.parse::<u64>().map_err(|_| CliError::Validation {
            field: field.into(),
            reason: "must be a whole number".into(),
        })
    };

    match key {
        "address" => profile.address = value,
        "device_model" | "device-model" | "model" => {
            value
                .parse::<kilosync_core::DeviceModel>()
                .map_err(|e| CliError::Validation {
                    field: "device_model".into(),
                    reason: e.to_string(),
                })?;
            profile.device_model = value;
        }
        "user" => profile.user = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "use_auth" | "use-auth" => {
            profile.use_auth = value.parse().map_err(|_| CliError::Validation {
                field: "use_auth".into(),
                reason: "must be 'true' or 'false'".into(),
            })?;
        }
        "interface" => {
            value
                .parse::<kilosync_core::VideoInterface>()
                .map_err(|reason| CliError::Validation {
                    field: "interface".into(),
                    reason,
                })?;
            profile.interface = Some(value);
        }
        "interval_ms" | "interval-ms" | "interval" => {
            profile.interval_ms = Some(number("interval_ms", &value)?);
        }
        "timeout_secs" | "timeout-secs" | "timeout" => {
            profile.timeout_secs = Some(number("timeout_secs", &value)?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: address, device_model, user, \
                     password_env, use_auth, interface, interval_ms, timeout_secs"
                ),
            });
        }
    }
    Ok(())
}

/// Copy of `cfg` with plaintext passwords hidden.
fn masked(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
    }
    cfg
}
