// ── API-to-domain type conversions ──
//
// Bridges raw `airbridge_api` listing entries into `airbridge_core::model`
// types. Readings keep only known kinds with numeric values; names fall
// back through the product descriptor.

use airbridge_api::{RawDevice, RawDeviceInfo, RawReading};
use serde_json::Value;

use crate::model::{Device, DeviceInfo, MacAddress, ProductId, ReadingKind, Readings};

// ── Helpers ────────────────────────────────────────────────────────

/// Numeric value of a reading. Numeric strings count; anything else is
/// treated as not reported.
fn numeric(reading: &RawReading) -> Option<f64> {
    let value: Option<f64> = match &reading.value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

// ── Device ─────────────────────────────────────────────────────────

impl From<RawDeviceInfo> for DeviceInfo {
    fn from(raw: RawDeviceInfo) -> Self {
        let product = raw.product;
        let product_name = non_empty(product.en_name)
            .or_else(|| non_empty(product.name))
            .or_else(|| non_empty(product.code))
            .unwrap_or_else(|| "Unknown".into());
        let display_name = non_empty(raw.name).unwrap_or_else(|| product_name.clone());

        Self {
            mac: MacAddress::new(&raw.mac),
            product_id: ProductId::from(product.id),
            product_name,
            display_name,
            firmware_version: non_empty(raw.version),
            group_id: raw.group_id,
            group_name: non_empty(raw.group_name),
            offline: raw.status.offline,
        }
    }
}

impl From<RawDevice> for Device {
    fn from(raw: RawDevice) -> Self {
        let data: Readings = raw
            .data
            .iter()
            .filter_map(|(key, reading)| {
                let kind = key.parse::<ReadingKind>().ok()?;
                numeric(reading.as_ref()?).map(|value| (kind, value))
            })
            .collect();

        Self {
            info: raw.info.into(),
            data,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawDevice {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn full_entry_converts() {
        let device = Device::from(raw(json!({
            "info": {
                "mac": "58:2d:34:00:aa:bb",
                "product": { "id": 1201, "code": "CGS1", "name": "青萍空气检测仪", "en_name": "Air Monitor" },
                "name": "Bedroom",
                "version": "4.1.8",
                "group_id": 7,
                "group_name": "Home",
                "status": { "offline": true }
            },
            "data": {
                "temperature": { "value": 22.5 },
                "humidity": { "value": 41 },
                "tvoc": { "value": "120" },
                "timestamp": { "value": 1_700_000_000 }
            }
        })));

        assert_eq!(device.info.mac.as_str(), "582D3400AABB");
        assert_eq!(device.info.product_id, ProductId::AirMonitor);
        assert_eq!(device.info.product_name, "Air Monitor");
        assert_eq!(device.info.display_name, "Bedroom");
        assert_eq!(device.info.firmware_version.as_deref(), Some("4.1.8"));
        assert_eq!(device.info.group_name.as_deref(), Some("Home"));
        assert!(device.info.offline);
        assert_eq!(device.data.get(ReadingKind::Humidity), Some(41.0));
        assert_eq!(device.data.get(ReadingKind::Tvoc), Some(120.0));
        assert_eq!(device.data.len(), 4);
    }

    #[test]
    fn non_numeric_and_unknown_readings_are_dropped() {
        let device = Device::from(raw(json!({
            "info": { "mac": "AABB", "product": { "id": 1203 } },
            "data": {
                "battery": { "value": null },
                "co2": { "value": "n/a" },
                "noise": { "value": 40 },
                "pm25": { "value": 0 }
            }
        })));

        assert!(!device.data.contains(ReadingKind::Battery));
        assert!(!device.data.contains(ReadingKind::Co2));
        assert_eq!(device.data.get(ReadingKind::Pm25), Some(0.0));
        assert_eq!(device.data.len(), 1);
    }

    #[test]
    fn null_readings_and_data_are_absent() {
        let device = Device::from(raw(json!({
            "info": { "mac": "AA01", "product": { "id": 1201 } },
            "data": { "co2": { "value": 500 }, "tvoc": null }
        })));
        assert_eq!(device.data.get(ReadingKind::Co2), Some(500.0));
        assert!(!device.data.contains(ReadingKind::Tvoc));

        let idle = Device::from(raw(json!({ "info": { "mac": "BB02" }, "data": null })));
        assert!(idle.data.is_empty());
    }

    #[test]
    fn names_fall_back_through_product() {
        let device = Device::from(raw(json!({
            "info": { "mac": "AABB", "product": { "id": 1203, "code": "CGDN1" }, "name": " " }
        })));
        assert_eq!(device.info.product_name, "CGDN1");
        assert_eq!(device.info.display_name, "CGDN1");

        let bare = Device::from(raw(json!({ "info": { "mac": "AABB" } })));
        assert_eq!(bare.info.product_name, "Unknown");
        assert_eq!(bare.info.product_id, ProductId::Other(0));
    }
}
