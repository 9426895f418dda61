//! Device polling and accessory reconciliation on top of `airbridge-api`.
//!
//! - **[`DeviceClient`]** polls the device listing and caches the last
//!   well-formed device set. A garbled payload never replaces it.
//!
//! - **[`AccessoryReconciler`]** diffs each poll against the known
//!   accessories, tells the [`AccessoryHost`] what to register or
//!   unregister, and hands out [`CapabilityBinding`]s whose getters read
//!   the latest device snapshot. [`start_polling`](AccessoryReconciler::start_polling)
//!   drives it on a timer and returns a [`PollHandle`].
//!
//! - **[`AirQualityClassifier`]** and **[`SensorResolver`]** turn raw
//!   readings into exposed values. Both are pure.
//!
//! - **[`AccessoryCache`]** persists the known set between runs.

pub mod air_quality;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod host;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod sensor;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use air_quality::{AirQualityClassifier, AirQualityLevel, AirQualityRule, Comparison};
pub use cache::{AccessoryCache, CachedAccessory};
pub use config::BridgeConfig;
pub use error::{CoreError, MissingReadingError};
pub use host::{AccessoryHost, stable_id};
pub use poller::{MIN_POLL_PERIOD, PollHandle};
pub use reconcile::{AccessoryReconciler, ReconciliationResult};
pub use sensor::{BatteryStatus, SensorResolver, TvocUnit, ZeroReading};
pub use store::{DeviceClient, DeviceSet};

pub use model::{
    AccessoryRecord, AccessoryRegistration, CapabilityBinding, CapabilityKind, CapabilityNames,
    Characteristic, CharacteristicValue, Device, DeviceInfo, MacAddress, ProductId, ReadingKind,
    Readings, SensorReading, capabilities_for,
};
