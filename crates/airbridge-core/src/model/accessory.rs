// ── Accessory domain types ──
//
// An `AccessoryRecord` binds one device (by mac) to the capabilities the
// host exposes for it. The bound device is swapped whole on every poll;
// bindings handed out earlier read through the record, so they always
// see the latest snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

use super::device::{Device, MacAddress, ReadingKind};
use crate::air_quality::{AirQualityClassifier, AirQualityLevel};
use crate::error::MissingReadingError;
use crate::sensor::{BatteryStatus, SensorResolver};

// ── Capabilities ────────────────────────────────────────────────────

/// One sensor service exposed to the host.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CapabilityKind {
    Temperature,
    Humidity,
    AirQuality,
    CarbonDioxide,
    Battery,
}

impl CapabilityKind {
    /// Capabilities every supported product exposes.
    pub const ALWAYS: [CapabilityKind; 4] = [
        Self::Temperature,
        Self::Humidity,
        Self::AirQuality,
        Self::CarbonDioxide,
    ];

    pub fn characteristics(self) -> &'static [Characteristic] {
        match self {
            Self::Temperature => &[Characteristic::CurrentTemperature],
            Self::Humidity => &[Characteristic::CurrentRelativeHumidity],
            Self::AirQuality => &[
                Characteristic::AirQuality,
                Characteristic::Pm25Density,
                Characteristic::VocDensity,
            ],
            Self::CarbonDioxide => &[Characteristic::CarbonDioxideLevel],
            Self::Battery => &[
                Characteristic::BatteryLevel,
                Characteristic::StatusLowBattery,
            ],
        }
    }
}

/// Capability set for a newly observed device.
///
/// Battery is only exposed when the device reported a numeric battery
/// reading; mains-powered models never do.
pub fn capabilities_for(device: &Device) -> BTreeSet<CapabilityKind> {
    let mut caps: BTreeSet<_> = CapabilityKind::ALWAYS.into_iter().collect();
    if device.data.contains(ReadingKind::Battery) {
        caps.insert(CapabilityKind::Battery);
    }
    caps
}

/// A single readable value within a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Characteristic {
    CurrentTemperature,
    CurrentRelativeHumidity,
    AirQuality,
    Pm25Density,
    VocDensity,
    CarbonDioxideLevel,
    BatteryLevel,
    StatusLowBattery,
}

impl Characteristic {
    /// Resolve this characteristic against a device snapshot.
    pub fn read(
        self,
        device: &Device,
        resolver: &SensorResolver,
        classifier: &AirQualityClassifier,
    ) -> Result<CharacteristicValue, MissingReadingError> {
        let data = &device.data;
        let number = |kind| resolver.read(data, kind).map(CharacteristicValue::Number);
        match self {
            Self::CurrentTemperature => number(ReadingKind::Temperature),
            Self::CurrentRelativeHumidity => number(ReadingKind::Humidity),
            Self::AirQuality => Ok(CharacteristicValue::AirQuality(
                classifier.classify(&resolver.present(data)),
            )),
            Self::Pm25Density => number(ReadingKind::Pm25),
            Self::VocDensity => number(ReadingKind::Tvoc),
            Self::CarbonDioxideLevel => number(ReadingKind::Co2),
            Self::BatteryLevel => number(ReadingKind::Battery),
            Self::StatusLowBattery => resolver.battery_status(data).map(CharacteristicValue::Battery),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Number(f64),
    AirQuality(AirQualityLevel),
    Battery(BatteryStatus),
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::AirQuality(level) => write!(f, "{level}"),
            Self::Battery(status) => write!(f, "{status}"),
        }
    }
}

// ── Display names ───────────────────────────────────────────────────

/// User-facing service names, overridable from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityNames {
    pub temperature: String,
    pub humidity: String,
    pub co2: String,
    pub aqi: String,
}

impl Default for CapabilityNames {
    fn default() -> Self {
        Self {
            temperature: "Temperature".into(),
            humidity: "Humidity".into(),
            co2: "Carbon Dioxide".into(),
            aqi: "Air Quality".into(),
        }
    }
}

impl CapabilityNames {
    pub fn name_for(&self, kind: CapabilityKind) -> &str {
        match kind {
            CapabilityKind::Temperature => &self.temperature,
            CapabilityKind::Humidity => &self.humidity,
            CapabilityKind::AirQuality => &self.aqi,
            CapabilityKind::CarbonDioxide => &self.co2,
            CapabilityKind::Battery => "Battery",
        }
    }
}

// ── AccessoryRecord ─────────────────────────────────────────────────

/// Local binding between one device and its exposed capabilities.
#[derive(Debug)]
pub struct AccessoryRecord {
    pub id: Uuid,
    pub mac: MacAddress,
    pub capabilities: BTreeSet<CapabilityKind>,
    device: ArcSwap<Device>,
}

impl AccessoryRecord {
    pub fn new(id: Uuid, device: Arc<Device>) -> Self {
        Self {
            id,
            mac: device.info.mac.clone(),
            capabilities: capabilities_for(&device),
            device: ArcSwap::new(device),
        }
    }

    /// The device snapshot currently bound to this accessory.
    pub fn device(&self) -> Arc<Device> {
        self.device.load_full()
    }

    pub(crate) fn replace_device(&self, device: Arc<Device>) {
        self.device.store(device);
    }

    pub fn read(
        &self,
        characteristic: Characteristic,
        resolver: &SensorResolver,
        classifier: &AirQualityClassifier,
    ) -> Result<CharacteristicValue, MissingReadingError> {
        characteristic.read(&self.device.load(), resolver, classifier)
    }

    /// One binding per characteristic of every exposed capability.
    pub fn bindings(
        self: &Arc<Self>,
        names: &CapabilityNames,
        resolver: &Arc<SensorResolver>,
        classifier: &Arc<AirQualityClassifier>,
    ) -> Vec<CapabilityBinding> {
        self.capabilities
            .iter()
            .flat_map(|&kind| {
                kind.characteristics().iter().map(move |&characteristic| {
                    let record = Arc::clone(self);
                    let resolver = Arc::clone(resolver);
                    let classifier = Arc::clone(classifier);
                    CapabilityBinding {
                        kind,
                        name: names.name_for(kind).to_owned(),
                        characteristic,
                        getter: Arc::new(move || {
                            record.read(characteristic, &resolver, &classifier)
                        }),
                    }
                })
            })
            .collect()
    }
}

// ── Bindings ────────────────────────────────────────────────────────

type Getter = dyn Fn() -> Result<CharacteristicValue, MissingReadingError> + Send + Sync;

/// A `(capability, value getter)` pair handed to the host.
#[derive(Clone)]
pub struct CapabilityBinding {
    pub kind: CapabilityKind,
    pub name: String,
    pub characteristic: Characteristic,
    getter: Arc<Getter>,
}

impl CapabilityBinding {
    pub fn read(&self) -> Result<CharacteristicValue, MissingReadingError> {
        (self.getter)()
    }
}

impl fmt::Debug for CapabilityBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityBinding")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("characteristic", &self.characteristic)
            .finish_non_exhaustive()
    }
}

/// Everything the host needs to register one accessory.
#[derive(Debug, Clone)]
pub struct AccessoryRegistration {
    pub record: Arc<AccessoryRecord>,
    pub bindings: Vec<CapabilityBinding>,
}
