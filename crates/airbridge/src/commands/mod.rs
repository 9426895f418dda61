//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod run;
pub mod token;

use secrecy::SecretString;

use airbridge_config::Config;
use airbridge_core::BridgeConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, global).await,
        Command::Devices => devices::handle(global).await,
        Command::Token => token::handle(global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        Command::Completions(_) => Ok(()),
    }
}

/// Load the config file named by `--config` (or the default location) and
/// apply command-line overrides.
pub fn load_settings(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = match global.config.as_deref() {
        Some(path) => airbridge_config::load_config_from(path)?,
        None => airbridge_config::load_config()?,
    };
    if let Some(ref key) = global.app_key {
        cfg.app_key = Some(key.clone());
    }
    Ok(cfg)
}

/// Resolve a runtime `BridgeConfig`. `--app-secret` wins over every
/// configured secret source.
pub fn bridge_config(global: &GlobalOpts, cfg: &Config) -> Result<BridgeConfig, CliError> {
    let bridge = match global.app_secret.as_deref() {
        Some(secret) => cfg.to_bridge_config_with_secret(SecretString::from(secret.to_owned()))?,
        None => {
            // Report a missing key before probing secret stores.
            cfg.validate()?;
            cfg.to_bridge_config()?
        }
    };
    Ok(bridge)
}
