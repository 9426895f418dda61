// Shared transport configuration for building reqwest::Client instances.
//
// The token manager and the device client share timeout and user-agent
// settings through this module, avoiding duplicated builder logic.

use std::time::Duration;

use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("airbridge/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }
}

/// Join a relative endpoint path onto a service base URL.
///
/// The base may or may not carry a trailing slash or a path prefix;
/// `https://host/prefix` + `oauth2/token` yields `https://host/prefix/oauth2/token`.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, Error> {
    let mut root = base.clone();
    let trimmed = root.path().trim_end_matches('/').to_owned();
    root.set_path(&format!("{trimmed}/"));
    Ok(root.join(path)?)
}
