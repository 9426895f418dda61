// OAuth2 client-credentials token lifecycle.
//
// One `TokenManager` owns one credential. The credential is swapped as a
// whole on each successful exchange and never mutated in place; a failed
// exchange leaves the previous credential where it was.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, preview};
use crate::transport::{TransportConfig, endpoint};
use crate::types::TokenResponse;

/// Scope requested on every exchange.
pub const DEVICE_SCOPE: &str = "device_full_access";

/// Fraction of the advertised lifetime after which a token is refreshed,
/// expressed in thousandths so the deadline math stays integral.
const REFRESH_AT_PER_MILLE: u64 = 990;

/// Application key + secret issued by the cloud developer portal.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_key: String,
    pub app_secret: SecretString,
}

/// A time-bounded bearer token obtained via client-credentials exchange.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: SecretString,
    pub token_type: String,
    pub scope: String,
    /// Moment the token response was received.
    pub issued_at: DateTime<Utc>,
    pub expires_in_secs: u64,
}

impl Credential {
    /// When this credential should be replaced: 99% of its lifetime after
    /// issue, so requests near the boundary never carry an expired token.
    pub fn refresh_deadline(&self) -> DateTime<Utc> {
        let lifetime_ms = self.expires_in_secs.saturating_mul(REFRESH_AT_PER_MILLE);
        i64::try_from(lifetime_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// `true` once `now` has reached the refresh deadline.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_deadline()
    }

    pub fn is_fresh(&self) -> bool {
        !self.needs_refresh_at(Utc::now())
    }
}

/// Owns the access credential and decides when to refresh it.
///
/// Concurrent callers that find the credential stale are coalesced: the
/// first takes the refresh gate and performs the exchange, the rest wait
/// on the gate and then reuse the credential it produced.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: Url,
    app: AppCredentials,
    current: ArcSwapOption<Credential>,
    refresh_gate: Mutex<()>,
}

impl TokenManager {
    /// Create a token manager for the given OAuth service root
    /// (e.g. `https://oauth.cleargrass.com`).
    pub fn new(
        oauth_base: &Url,
        app: AppCredentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, oauth_base, app)
    }

    /// Create a token manager with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        oauth_base: &Url,
        app: AppCredentials,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            token_url: endpoint(oauth_base, "oauth2/token")?,
            app,
            current: ArcSwapOption::const_empty(),
            refresh_gate: Mutex::new(()),
        })
    }

    /// The cached credential, fresh or not.
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.current.load_full()
    }

    /// Drop the cached credential so the next caller re-authenticates.
    pub fn invalidate(&self) {
        debug!("invalidating cached access token");
        self.current.store(None);
    }

    /// Return the cached credential if it is still before its refresh
    /// deadline, otherwise exchange for a new one.
    pub async fn ensure_valid_token(&self) -> Result<Arc<Credential>, Error> {
        if let Some(credential) = self.fresh() {
            trace!("reusing cached access token");
            return Ok(credential);
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have completed an exchange while we waited.
        if let Some(credential) = self.fresh() {
            trace!("access token refreshed by a concurrent caller");
            return Ok(credential);
        }

        self.exchange().await
    }

    /// Unconditionally perform a client-credentials exchange.
    pub async fn refresh(&self) -> Result<Arc<Credential>, Error> {
        let _gate = self.refresh_gate.lock().await;
        self.exchange().await
    }

    fn fresh(&self) -> Option<Arc<Credential>> {
        self.current.load_full().filter(|c| c.is_fresh())
    }

    /// Callers must hold `refresh_gate`.
    async fn exchange(&self) -> Result<Arc<Credential>, Error> {
        debug!("POST {}", self.token_url);

        let resp = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.app.app_key, Some(self.app.app_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials"), ("scope", DEVICE_SCOPE)])
            .send()
            .await
            .map_err(|e| Error::Authentication {
                message: format!("token request failed: {e}"),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Authentication {
            message: format!("token response unreadable: {e}"),
        })?;

        if !status.is_success() {
            return Err(Error::Authentication {
                message: format!("token exchange rejected (HTTP {status}): {}", preview(&body)),
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authentication {
                message: format!("token response malformed: {e} (body preview: {:?})", preview(&body)),
            })?;

        let credential = Arc::new(Credential {
            token: SecretString::from(token.access_token),
            token_type: token.token_type,
            scope: token.scope,
            issued_at: Utc::now(),
            expires_in_secs: token.expires_in,
        });

        debug!(
            expires_in = credential.expires_in_secs,
            deadline = %credential.refresh_deadline(),
            "access token refreshed"
        );
        self.current.store(Some(Arc::clone(&credential)));
        Ok(credential)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credential(issued_at: DateTime<Utc>, expires_in_secs: u64) -> Credential {
        Credential {
            token: SecretString::from("abc".to_owned()),
            token_type: "Bearer".into(),
            scope: DEVICE_SCOPE.into(),
            issued_at,
            expires_in_secs,
        }
    }

    #[test]
    fn deadline_is_ninety_nine_percent_of_lifetime() {
        let issued = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let c = credential(issued, 7200);
        // 7200s * 0.99 = 7128s
        assert_eq!(c.refresh_deadline(), issued + TimeDelta::seconds(7128));
    }

    #[test]
    fn refresh_needed_at_and_after_deadline() {
        let issued = Utc::now();
        let c = credential(issued, 100);
        let deadline = c.refresh_deadline();

        assert!(!c.needs_refresh_at(deadline - TimeDelta::milliseconds(1)));
        assert!(c.needs_refresh_at(deadline));
        assert!(c.needs_refresh_at(deadline + TimeDelta::seconds(1)));
    }

    #[test]
    fn zero_lifetime_is_immediately_stale() {
        let c = credential(Utc::now(), 0);
        assert!(!c.is_fresh());
    }

    #[test]
    fn huge_lifetime_does_not_overflow() {
        let c = credential(Utc::now(), u64::MAX);
        assert_eq!(c.refresh_deadline(), DateTime::<Utc>::MAX_UTC);
        assert!(c.is_fresh());
    }
}
