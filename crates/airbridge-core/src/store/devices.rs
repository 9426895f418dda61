// ── Device set cache ──
//
// Holds the device set from the most recent well-formed listing. The set
// is replaced in one swap; readers see either the old set or the new one.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use indexmap::map::Entry;
use tokio::sync::watch;
use tracing::{debug, warn};

use airbridge_api::{CloudClient, DeviceListing, TokenManager};

use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::model::{Device, MacAddress};

/// Snapshot of every device from one poll, in response order.
pub type DeviceSet = Arc<Vec<Arc<Device>>>;

/// Fetches the device listing and caches the last good device set.
pub struct DeviceClient {
    api: CloudClient,
    devices: ArcSwap<Vec<Arc<Device>>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

impl DeviceClient {
    pub fn new(api: CloudClient) -> Self {
        let (last_update, _) = watch::channel(None);
        Self {
            api,
            devices: ArcSwap::from_pointee(Vec::new()),
            last_update,
        }
    }

    /// Build the token manager and cloud client from config. Both share
    /// one connection pool.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, CoreError> {
        let http = config.transport().build_client()?;
        let tokens = Arc::new(TokenManager::with_client(
            http.clone(),
            &config.oauth_url,
            config.app.clone(),
        )?);
        let api = CloudClient::with_client(http, &config.api_url, tokens)?;
        Ok(Self::new(api))
    }

    /// Poll the listing endpoint and replace the cached set on success.
    ///
    /// Returns the size of the new set. A malformed body yields
    /// [`CoreError::MalformedResponse`] and leaves the cache untouched;
    /// transport and auth failures propagate without touching it either.
    pub async fn update_devices(&self) -> Result<usize, CoreError> {
        let listing = self.api.list_devices().await?;

        let raw = match listing {
            DeviceListing::Devices { devices, total } => {
                debug!(count = devices.len(), total = ?total, "device listing received");
                devices
            }
            DeviceListing::Malformed { reason } => {
                warn!(%reason, "ignoring malformed device listing, keeping cached devices");
                return Err(CoreError::MalformedResponse { reason });
            }
        };

        let mut by_mac: IndexMap<MacAddress, Arc<Device>> = IndexMap::with_capacity(raw.len());
        for entry in raw {
            let device = Device::from(entry);
            match by_mac.entry(device.info.mac.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(device));
                }
                Entry::Occupied(_) => {
                    warn!(mac = %device.info.mac, "duplicate device in listing, keeping first");
                }
            }
        }

        let count = by_mac.len();
        self.devices.store(Arc::new(by_mac.into_values().collect()));
        self.last_update.send_replace(Some(Utc::now()));
        Ok(count)
    }

    /// The cached device set.
    pub fn devices(&self) -> DeviceSet {
        self.devices.load_full()
    }

    /// When the cache was last replaced, if ever.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    pub fn subscribe_updates(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_update.subscribe()
    }
}
