// Device API HTTP client
//
// Wraps `reqwest::Client` with bearer-token injection from the shared
// `TokenManager`, cache-busting query construction, and status mapping.
// Body *shape* validation is left to `DeviceListing` so a garbled payload
// is reported, not raised.

use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use tracing::debug;
use url::Url;

use crate::auth::TokenManager;
use crate::error::{Error, preview};
use crate::transport::{TransportConfig, endpoint};
use crate::types::DeviceListing;

const DEVICES_PATH: &str = "v1/apis/devices";

/// Raw HTTP client for the cloud device API.
pub struct CloudClient {
    http: reqwest::Client,
    devices_url: Url,
    tokens: Arc<TokenManager>,
}

impl CloudClient {
    /// Create a new client for the API root (e.g. `https://apis.cleargrass.com`).
    pub fn new(
        api_base: &Url,
        tokens: Arc<TokenManager>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, api_base, tokens)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        api_base: &Url,
        tokens: Arc<TokenManager>,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            devices_url: endpoint(api_base, DEVICES_PATH)?,
            tokens,
        })
    }

    /// The token manager shared with this client.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Fetch the device listing.
    ///
    /// Transport failures, auth failures and non-2xx statuses are errors.
    /// A 2xx body whose shape is wrong comes back as
    /// [`DeviceListing::Malformed`]. A 401 invalidates the cached token so
    /// the next call re-authenticates.
    pub async fn list_devices(&self) -> Result<DeviceListing, Error> {
        let credential = self.tokens.ensure_valid_token().await?;
        let timestamp = Utc::now().timestamp_millis();
        debug!("GET {} timestamp={timestamp}", self.devices_url);

        let resp = self
            .http
            .get(self.devices_url.clone())
            .query(&[("timestamp", timestamp)])
            .bearer_auth(credential.token.expose_secret())
            .send()
            .await?;

        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate();
            return Err(Error::Unauthorized);
        }

        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    preview(&body).to_owned()
                },
            });
        }

        Ok(DeviceListing::from_body(&body))
    }
}
