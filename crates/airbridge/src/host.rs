//! Standalone accessory host.
//!
//! Without a smart-home runtime to hand accessories to, the binary logs
//! registrations, keeps the bindings so values can be sampled, and mirrors
//! the accessory set into the on-disk cache after every change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use airbridge_core::{
    AccessoryCache, AccessoryHost, AccessoryRecord, AccessoryRegistration, CachedAccessory,
    CapabilityBinding,
};

struct HostedAccessory {
    record: Arc<AccessoryRecord>,
    bindings: Vec<CapabilityBinding>,
}

pub struct LoggingHost {
    cache: AccessoryCache,
    accessories: Mutex<IndexMap<Uuid, HostedAccessory>>,
}

impl LoggingHost {
    pub fn new(cache: AccessoryCache) -> Self {
        Self {
            cache,
            accessories: Mutex::new(IndexMap::new()),
        }
    }

    pub fn cache(&self) -> &AccessoryCache {
        &self.cache
    }

    /// Take over accessories restored from the cache. They were registered
    /// by a previous run, so this only re-binds them.
    pub fn attach(&self, restored: Vec<AccessoryRegistration>) {
        let mut hosted = self.lock();
        for reg in restored {
            debug!(id = %reg.record.id, mac = %reg.record.mac, "re-binding cached accessory");
            hosted.insert(reg.record.id, hosted_from(reg));
        }
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Read every binding once and log the values.
    pub fn sample(&self) {
        let hosted = self.lock();
        for accessory in hosted.values() {
            for binding in &accessory.bindings {
                match binding.read() {
                    Ok(value) => debug!(
                        mac = %accessory.record.mac,
                        service = %binding.name,
                        characteristic = %binding.characteristic,
                        %value,
                        "value"
                    ),
                    Err(e) => debug!(
                        mac = %accessory.record.mac,
                        characteristic = %binding.characteristic,
                        error = %e,
                        "value unavailable"
                    ),
                }
            }
        }
    }

    /// Write the current set to the cache file. Failures are logged, not
    /// returned: the next change retries the write.
    pub fn persist(&self, snapshot: &[CachedAccessory]) {
        if let Err(e) = self.cache.save(snapshot) {
            warn!(path = %self.cache.path().display(), error = %e, "failed to persist accessory cache");
        }
    }

    fn persist_hosted(&self, hosted: &IndexMap<Uuid, HostedAccessory>) {
        let snapshot: Vec<CachedAccessory> = hosted
            .values()
            .map(|h| CachedAccessory::from_record(&h.record))
            .collect();
        self.persist(&snapshot);
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<Uuid, HostedAccessory>> {
        self.accessories.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn hosted_from(reg: AccessoryRegistration) -> HostedAccessory {
    HostedAccessory {
        record: reg.record,
        bindings: reg.bindings,
    }
}

impl AccessoryHost for LoggingHost {
    fn register_accessories(&self, accessories: &[AccessoryRegistration]) {
        let mut hosted = self.lock();
        for reg in accessories {
            let device = reg.record.device();
            let info = &device.info;
            info!(
                id = %reg.record.id,
                mac = %reg.record.mac,
                name = %info.display_name,
                product = %info.product_name,
                services = reg.bindings.len(),
                "registering accessory"
            );
            hosted.insert(reg.record.id, hosted_from(reg.clone()));
        }
        self.persist_hosted(&hosted);
    }

    fn unregister_accessories(&self, ids: &[Uuid]) {
        let mut hosted = self.lock();
        for id in ids {
            if let Some(gone) = hosted.shift_remove(id) {
                info!(%id, mac = %gone.record.mac, "unregistering accessory");
            }
        }
        self.persist_hosted(&hosted);
    }
}
