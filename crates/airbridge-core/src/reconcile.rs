// ── Accessory reconciliation ──
//
// Diffs the polled device set against the known accessory set and applies
// the difference: new devices are registered, vanished ones unregistered,
// survivors get their bound device swapped. The accessory map is replaced
// whole, so readers never see a half-applied cycle.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::air_quality::AirQualityClassifier;
use crate::cache::CachedAccessory;
use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::host::AccessoryHost;
use crate::model::{
    AccessoryRecord, AccessoryRegistration, CapabilityBinding, CapabilityNames, Device, MacAddress,
};
use crate::sensor::SensorResolver;
use crate::store::DeviceClient;

type AccessoryMap = IndexMap<Uuid, Arc<AccessoryRecord>>;

// ── Result ──────────────────────────────────────────────────────────

/// What one sync cycle changed.
#[derive(Debug, Default)]
pub struct ReconciliationResult {
    pub added: Vec<Arc<AccessoryRecord>>,
    pub updated: Vec<Arc<AccessoryRecord>>,
    pub removed: Vec<Arc<AccessoryRecord>>,
    /// Devices skipped because their product is not supported.
    pub unsupported: Vec<MacAddress>,
}

impl ReconciliationResult {
    pub fn added_ids(&self) -> Vec<Uuid> {
        self.added.iter().map(|r| r.id).collect()
    }

    pub fn updated_ids(&self) -> Vec<Uuid> {
        self.updated.iter().map(|r| r.id).collect()
    }

    pub fn removed_ids(&self) -> Vec<Uuid> {
        self.removed.iter().map(|r| r.id).collect()
    }

    /// `true` when no accessory was added or removed.
    pub fn is_membership_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

// ── Planning ────────────────────────────────────────────────────────

/// Pure diff of known accessories against the current device set.
#[derive(Debug, Default)]
struct SyncPlan {
    added: Vec<(Uuid, Arc<Device>)>,
    updated: Vec<(Arc<AccessoryRecord>, Arc<Device>)>,
    removed: Vec<Arc<AccessoryRecord>>,
}

fn plan(known: &AccessoryMap, current: &[(Uuid, Arc<Device>)]) -> SyncPlan {
    let mut sync_plan = SyncPlan::default();
    let mut present = HashSet::with_capacity(current.len());

    for (id, device) in current {
        if !present.insert(*id) {
            warn!(mac = %device.mac(), %id, "accessory id already claimed in this poll, skipping");
            continue;
        }
        match known.get(id) {
            Some(record) => sync_plan
                .updated
                .push((Arc::clone(record), Arc::clone(device))),
            None => sync_plan.added.push((*id, Arc::clone(device))),
        }
    }

    sync_plan.removed = known
        .values()
        .filter(|record| !present.contains(&record.id))
        .cloned()
        .collect();

    sync_plan
}

// ── Reconciler ──────────────────────────────────────────────────────

/// State owned by whichever sync or restore currently holds the gate.
#[derive(Default)]
struct SyncState {
    /// Unsupported devices already warned about, so each is logged once.
    warned_unsupported: HashSet<MacAddress>,
}

/// Keeps the accessory set in step with the polled device set.
pub struct AccessoryReconciler {
    devices: Arc<DeviceClient>,
    host: Arc<dyn AccessoryHost>,
    resolver: Arc<SensorResolver>,
    classifier: Arc<AirQualityClassifier>,
    names: CapabilityNames,
    accessories: ArcSwap<AccessoryMap>,
    /// Held for the length of a sync or restore. A second caller gets
    /// `SyncInProgress` instead of waiting.
    sync_gate: Mutex<SyncState>,
}

impl AccessoryReconciler {
    pub fn new(
        devices: Arc<DeviceClient>,
        host: Arc<dyn AccessoryHost>,
        resolver: SensorResolver,
        classifier: AirQualityClassifier,
        names: CapabilityNames,
    ) -> Self {
        Self {
            devices,
            host,
            resolver: Arc::new(resolver),
            classifier: Arc::new(classifier),
            names,
            accessories: ArcSwap::from_pointee(IndexMap::new()),
            sync_gate: Mutex::new(SyncState::default()),
        }
    }

    /// Wire up the whole polling stack from config.
    pub fn from_config(
        config: &BridgeConfig,
        host: Arc<dyn AccessoryHost>,
    ) -> Result<Self, CoreError> {
        Ok(Self::new(
            Arc::new(DeviceClient::from_config(config)?),
            host,
            config.resolver(),
            AirQualityClassifier::default(),
            config.names.clone(),
        ))
    }

    pub fn device_client(&self) -> &Arc<DeviceClient> {
        &self.devices
    }

    /// Known accessories, oldest first.
    pub fn accessories(&self) -> Vec<Arc<AccessoryRecord>> {
        self.accessories.load().values().cloned().collect()
    }

    pub fn accessory(&self, id: &Uuid) -> Option<Arc<AccessoryRecord>> {
        self.accessories.load().get(id).cloned()
    }

    /// Capability bindings for one accessory.
    pub fn bindings(&self, record: &Arc<AccessoryRecord>) -> Vec<CapabilityBinding> {
        record.bindings(&self.names, &self.resolver, &self.classifier)
    }

    /// Snapshot of the known set in cache form.
    pub fn cached_accessories(&self) -> Vec<CachedAccessory> {
        self.accessories
            .load()
            .values()
            .map(|r| CachedAccessory::from_record(r))
            .collect()
    }

    fn registration(&self, record: Arc<AccessoryRecord>) -> AccessoryRegistration {
        AccessoryRegistration {
            bindings: self.bindings(&record),
            record,
        }
    }

    /// Seed the known set from a persisted cache before the first sync.
    ///
    /// Entries are keyed by the id computed from their mac, whatever id
    /// they were stored under. The host already knows these accessories,
    /// so nothing is registered; the returned registrations carry fresh
    /// bindings for the host to attach.
    pub fn restore(
        &self,
        entries: Vec<CachedAccessory>,
    ) -> Result<Vec<AccessoryRegistration>, CoreError> {
        let Ok(_gate) = self.sync_gate.try_lock() else {
            return Err(CoreError::SyncInProgress);
        };

        let mut next = AccessoryMap::clone(&self.accessories.load());
        let mut restored = Vec::with_capacity(entries.len());

        for entry in entries {
            let device = Arc::new(entry.device);
            if !device.info.product_id.is_supported() {
                debug!(mac = %device.mac(), "dropping cached accessory for unsupported product");
                continue;
            }

            let id = self.host.stable_id(device.mac());
            if id != entry.id {
                debug!(mac = %device.mac(), cached = %entry.id, %id, "re-keying cached accessory");
            }
            if next.contains_key(&id) {
                debug!(mac = %device.mac(), %id, "accessory already known, skipping cached entry");
                continue;
            }

            let record = Arc::new(AccessoryRecord::new(id, device));
            next.insert(id, Arc::clone(&record));
            restored.push(self.registration(record));
        }

        info!(count = restored.len(), "restored cached accessories");
        self.accessories.store(Arc::new(next));
        Ok(restored)
    }

    /// Run one poll-and-reconcile cycle.
    ///
    /// A fetch or auth failure aborts the cycle with the accessory set
    /// untouched. A malformed listing is not fatal: the cycle runs against
    /// the cached device set. An overlapping call returns
    /// [`CoreError::SyncInProgress`].
    pub async fn sync(&self) -> Result<ReconciliationResult, CoreError> {
        let Ok(mut state) = self.sync_gate.try_lock() else {
            return Err(CoreError::SyncInProgress);
        };

        match self.devices.update_devices().await {
            Ok(count) => debug!(count, "device set refreshed"),
            Err(e) if e.keeps_cached_devices() && self.devices.last_update().is_some() => {
                debug!("reconciling against cached device set");
            }
            Err(e) => return Err(e),
        }

        let snapshot = self.devices.devices();
        let mut unsupported = Vec::new();
        let mut current = Vec::with_capacity(snapshot.len());

        for device in snapshot.iter() {
            let info = &device.info;
            if !info.product_id.is_supported() {
                let err = CoreError::UnsupportedDevice {
                    mac: info.mac.clone(),
                    product_id: info.product_id.code(),
                    product_name: info.product_name.clone(),
                };
                if state.warned_unsupported.insert(info.mac.clone()) {
                    warn!(error = %err, "skipping unsupported device");
                } else {
                    debug!(error = %err, "skipping unsupported device");
                }
                unsupported.push(info.mac.clone());
                continue;
            }
            if info.offline {
                debug!(mac = %info.mac, "device reported offline, binding last known readings");
            }
            current.push((self.host.stable_id(&info.mac), Arc::clone(device)));
        }

        let known = self.accessories.load_full();
        let sync_plan = plan(&known, &current);

        // Updates swap in place; bindings already handed out see them.
        let mut updated = Vec::with_capacity(sync_plan.updated.len());
        for (record, device) in sync_plan.updated {
            record.replace_device(device);
            debug!(mac = %record.mac, id = %record.id, "accessory updated");
            updated.push(record);
        }

        let added: Vec<Arc<AccessoryRecord>> = sync_plan
            .added
            .into_iter()
            .map(|(id, device)| Arc::new(AccessoryRecord::new(id, device)))
            .collect();

        let removed_ids: HashSet<Uuid> = sync_plan.removed.iter().map(|r| r.id).collect();
        let mut next: AccessoryMap = known
            .iter()
            .filter(|(id, _)| !removed_ids.contains(*id))
            .map(|(id, record)| (*id, Arc::clone(record)))
            .collect();
        for record in &added {
            next.insert(record.id, Arc::clone(record));
        }
        self.accessories.store(Arc::new(next));

        if !sync_plan.removed.is_empty() {
            for record in &sync_plan.removed {
                info!(mac = %record.mac, id = %record.id, "accessory removed");
            }
            let ids: Vec<Uuid> = sync_plan.removed.iter().map(|r| r.id).collect();
            self.host.unregister_accessories(&ids);
        }

        if !added.is_empty() {
            for record in &added {
                let device = record.device();
                info!(
                    mac = %record.mac,
                    id = %record.id,
                    name = %device.info.display_name,
                    product = %device.info.product_name,
                    "accessory added"
                );
            }
            let registrations: Vec<AccessoryRegistration> = added
                .iter()
                .map(|r| self.registration(Arc::clone(r)))
                .collect();
            self.host.register_accessories(&registrations);
        }

        Ok(ReconciliationResult {
            added,
            updated,
            removed: sync_plan.removed,
            unsupported,
        })
    }
}
