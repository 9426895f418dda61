// ── Runtime bridge configuration ──
//
// Describes which cloud endpoints to talk to, with which application
// credentials, and how readings are presented. Never touches disk: the
// binary builds a `BridgeConfig` from whatever sources it supports.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use airbridge_api::{AppCredentials, TransportConfig};

use crate::error::CoreError;
use crate::model::CapabilityNames;
use crate::sensor::{SensorResolver, TvocUnit, ZeroReading};

pub const DEFAULT_OAUTH_URL: &str = "https://oauth.cleargrass.com";
pub const DEFAULT_API_URL: &str = "https://apis.cleargrass.com";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// OAuth service root; the token endpoint is `<root>/oauth2/token`.
    pub oauth_url: Url,
    /// Device API root; the listing is `<root>/v1/apis/devices`.
    pub api_url: Url,
    pub app: AppCredentials,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub names: CapabilityNames,
    pub tvoc_unit: TvocUnit,
    pub zero_reading: ZeroReading,
}

impl BridgeConfig {
    /// Defaults for everything except the application credentials.
    pub fn new(app_key: impl Into<String>, app_secret: SecretString) -> Result<Self, CoreError> {
        Ok(Self {
            oauth_url: parse_url(DEFAULT_OAUTH_URL)?,
            api_url: parse_url(DEFAULT_API_URL)?,
            app: AppCredentials {
                app_key: app_key.into(),
                app_secret,
            },
            timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
            names: CapabilityNames::default(),
            tvoc_unit: TvocUnit::default(),
            zero_reading: ZeroReading::default(),
        })
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
        }
    }

    pub fn resolver(&self) -> SensorResolver {
        SensorResolver::new(self.tvoc_unit, self.zero_reading)
    }
}

fn parse_url(raw: &str) -> Result<Url, CoreError> {
    Url::parse(raw).map_err(|e| CoreError::Config {
        message: format!("invalid URL {raw:?}: {e}"),
    })
}
