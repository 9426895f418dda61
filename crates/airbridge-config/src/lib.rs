//! Configuration for the airbridge binary.
//!
//! TOML file + `AIRBRIDGE_*` environment layering, app-secret resolution
//! (env + keyring + plaintext), and translation to
//! `airbridge_core::BridgeConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
    value::{Dict, Tag, Value},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use airbridge_core::config::{DEFAULT_API_URL, DEFAULT_OAUTH_URL};
use airbridge_core::{BridgeConfig, CapabilityNames, TvocUnit, ZeroReading};

const KEYRING_SERVICE: &str = "airbridge";
const KEYRING_SECRET_ENTRY: &str = "app-secret";
const ENV_PREFIX: &str = "AIRBRIDGE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required setting '{field}'")]
    MissingField { field: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config struct ──────────────────────────────────────────────

/// Flat bridge configuration.
///
/// Keys are snake_case; the camelCase spellings (`appKey`, `tvocUnit`, ...)
/// are accepted too and folded onto them at load time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// OAuth application key.
    pub app_key: Option<String>,

    /// OAuth application secret (plaintext; prefer keyring or env var).
    pub app_secret: Option<String>,

    /// Environment variable name holding the application secret.
    pub app_secret_env: Option<String>,

    /// Poll period in milliseconds.
    pub interval: u64,

    pub temperature_name: String,
    pub humidity_name: String,
    pub co2_name: String,
    pub aqi_name: String,

    /// Unit the cloud reports TVOC in.
    pub tvoc_unit: TvocUnit,

    /// Whether a reading of exactly 0 counts as a value.
    pub zero_reading: ZeroReading,

    pub oauth_url: String,
    pub api_url: String,

    /// HTTP timeout in seconds.
    pub timeout: u64,

    /// Persisted accessory cache. Defaults to the platform data directory.
    pub accessory_cache: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let names = CapabilityNames::default();
        Self {
            app_key: None,
            app_secret: None,
            app_secret_env: None,
            interval: 2000,
            temperature_name: names.temperature,
            humidity_name: names.humidity,
            co2_name: names.co2,
            aqi_name: names.aqi,
            tvoc_unit: TvocUnit::default(),
            zero_reading: ZeroReading::default(),
            oauth_url: DEFAULT_OAUTH_URL.into(),
            api_url: DEFAULT_API_URL.into(),
            timeout: 30,
            accessory_cache: None,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "airbridge", "airbridge")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "airbridge", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the accessory cache.
pub fn default_accessory_cache() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "airbridge", "accessories.json"]),
        |dirs| dirs.data_dir().join("accessories.json"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` (missing file is fine) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX));

    let merged: Dict = figment.extract()?;
    let config = Value::Dict(Tag::Default, fold_aliases(merged)).deserialize::<Config>()?;
    Ok(config)
}

/// Fold camelCase keys onto their snake_case names. An explicit
/// snake_case key wins, so `AIRBRIDGE_APP_KEY` overrides `appKey`.
fn fold_aliases(dict: Dict) -> Dict {
    let mut folded = Dict::new();
    let mut aliased = Vec::new();

    for (key, value) in dict {
        let snake = snake_case(&key);
        if snake == key {
            folded.insert(key, value);
        } else {
            aliased.push((snake, value));
        }
    }
    for (key, value) in aliased {
        folded.entry(key).or_insert(value);
    }
    folded
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ── Rendering ───────────────────────────────────────────────────────

/// Render config as TOML with the plaintext secret masked.
pub fn render_redacted(cfg: &Config) -> Result<String, ConfigError> {
    let mut shown = cfg.clone();
    if shown.app_secret.is_some() {
        shown.app_secret = Some("********".into());
    }
    Ok(toml::to_string_pretty(&shown)?)
}

// ── Secret resolution ───────────────────────────────────────────────

/// Resolve the application secret: `app_secret_env` → keyring → plaintext.
pub fn resolve_app_secret(cfg: &Config) -> Result<SecretString, ConfigError> {
    resolve_app_secret_with(cfg, keyring_secret)
}

fn keyring_secret() -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_SECRET_ENTRY)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

fn resolve_app_secret_with(
    cfg: &Config,
    keyring_lookup: impl FnOnce() -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(val) = cfg
        .app_secret_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring_lookup() {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    cfg.app_secret
        .clone()
        .filter(|s| !s.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingField {
            field: "app_secret".into(),
        })
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    pub fn accessory_cache_path(&self) -> PathBuf {
        self.accessory_cache
            .clone()
            .unwrap_or_else(default_accessory_cache)
    }

    pub fn names(&self) -> CapabilityNames {
        CapabilityNames {
            temperature: self.temperature_name.clone(),
            humidity: self.humidity_name.clone(),
            co2: self.co2_name.clone(),
            aqi: self.aqi_name.clone(),
        }
    }

    /// Check everything that does not need the secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingField {
                field: "app_key".into(),
            });
        }
        if self.interval == 0 {
            return Err(ConfigError::Validation {
                field: "interval".into(),
                reason: "must be greater than 0 milliseconds".into(),
            });
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be greater than 0 seconds".into(),
            });
        }
        parse_url("oauth_url", &self.oauth_url)?;
        parse_url("api_url", &self.api_url)?;
        Ok(())
    }

    /// Build the runtime `BridgeConfig`, resolving the secret.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let secret = resolve_app_secret(self)?;
        self.to_bridge_config_with_secret(secret)
    }

    pub fn to_bridge_config_with_secret(
        &self,
        app_secret: SecretString,
    ) -> Result<BridgeConfig, ConfigError> {
        self.validate()?;
        let app_key = self.app_key.clone().unwrap_or_default();

        let mut bridge =
            BridgeConfig::new(app_key, app_secret).map_err(|e| ConfigError::Validation {
                field: "defaults".into(),
                reason: e.to_string(),
            })?;
        bridge.oauth_url = parse_url("oauth_url", &self.oauth_url)?;
        bridge.api_url = parse_url("api_url", &self.api_url)?;
        bridge.timeout = Duration::from_secs(self.timeout);
        bridge.poll_interval = self.poll_interval();
        bridge.names = self.names();
        bridge.tvoc_unit = self.tvoc_unit;
        bridge.zero_reading = self.zero_reading;
        Ok(bridge)
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected an http(s) URL, got '{raw}'"),
        });
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use secrecy::ExposeSecret;

    fn with_key() -> Config {
        Config {
            app_key: Some("key".into()),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_apply_without_file() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.interval, 2000);
            assert_eq!(cfg.co2_name, "Carbon Dioxide");
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_layer_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    app_key = "from-file"
                    interval = 5000
                    tvoc_unit = "ppb"
                    aqi_name = "Luft"
                "#,
            )?;
            jail.set_env("AIRBRIDGE_INTERVAL", "7000");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.app_key.as_deref(), Some("from-file"));
            assert_eq!(cfg.interval, 7000);
            assert_eq!(cfg.tvoc_unit, TvocUnit::Ppb);
            assert_eq!(cfg.aqi_name, "Luft");
            Ok(())
        });
    }

    #[test]
    fn camel_case_keys_are_accepted() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    appKey = "camel"
                    appSecret = "shh"
                    tvocUnit = "ppb"
                    temperatureName = "Temp"
                    co2Name = "CO2"
                "#,
            )?;

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.app_key.as_deref(), Some("camel"));
            assert_eq!(cfg.app_secret.as_deref(), Some("shh"));
            assert_eq!(cfg.tvoc_unit, TvocUnit::Ppb);
            assert_eq!(cfg.temperature_name, "Temp");
            assert_eq!(cfg.co2_name, "CO2");
            Ok(())
        });
    }

    #[test]
    fn snake_case_env_overrides_camel_case_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", r#"appKey = "file""#)?;
            jail.set_env("AIRBRIDGE_APP_KEY", "env");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.app_key.as_deref(), Some("env"));
            Ok(())
        });
    }

    #[test]
    fn secret_resolution_order() {
        Jail::expect_with(|jail| {
            jail.set_env("AIRBRIDGE_TEST_SECRET", "from-env");
            let mut cfg = with_key();
            cfg.app_secret = Some("plain".into());

            let secret = resolve_app_secret_with(&cfg, || Some("from-keyring".into())).unwrap();
            assert_eq!(secret.expose_secret(), "from-keyring");

            cfg.app_secret_env = Some("AIRBRIDGE_TEST_SECRET".into());
            let secret = resolve_app_secret_with(&cfg, || Some("from-keyring".into())).unwrap();
            assert_eq!(secret.expose_secret(), "from-env");

            cfg.app_secret_env = None;
            let secret = resolve_app_secret_with(&cfg, || None).unwrap();
            assert_eq!(secret.expose_secret(), "plain");
            Ok(())
        });
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = resolve_app_secret_with(&with_key(), || None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "app_secret"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "app_key"));

        let cfg = Config {
            interval: 0,
            ..with_key()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "interval"
        ));

        let cfg = Config {
            api_url: "not a url".into(),
            ..with_key()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "api_url"
        ));
    }

    #[test]
    fn bridge_config_carries_settings() {
        let cfg = Config {
            interval: 4500,
            tvoc_unit: TvocUnit::Ppb,
            zero_reading: ZeroReading::Missing,
            humidity_name: "RH".into(),
            api_url: "http://127.0.0.1:8080/".into(),
            ..with_key()
        };
        let bridge = cfg
            .to_bridge_config_with_secret(SecretString::from("s".to_owned()))
            .unwrap();

        assert_eq!(bridge.poll_interval, Duration::from_millis(4500));
        assert_eq!(bridge.tvoc_unit, TvocUnit::Ppb);
        assert_eq!(bridge.zero_reading, ZeroReading::Missing);
        assert_eq!(bridge.names.humidity, "RH");
        assert_eq!(bridge.api_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(bridge.app.app_key, "key");
    }

    #[test]
    fn redacted_render_hides_secret() {
        let cfg = Config {
            app_secret: Some("hunter2".into()),
            ..with_key()
        };
        let rendered = render_redacted(&cfg).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("app_key = \"key\""));
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(snake_case("appSecretEnv"), "app_secret_env");
        assert_eq!(snake_case("co2Name"), "co2_name");
        assert_eq!(snake_case("interval"), "interval");
    }
}
