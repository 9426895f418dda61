// ── Domain model ──

pub mod accessory;
pub mod device;

pub use accessory::{
    AccessoryRecord, AccessoryRegistration, CapabilityBinding, CapabilityKind, CapabilityNames,
    Characteristic, CharacteristicValue, capabilities_for,
};
pub use device::{Device, DeviceInfo, MacAddress, ProductId, ReadingKind, Readings, SensorReading};
