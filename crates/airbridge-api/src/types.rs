// Wire types for the cloud API.
//
// These mirror the JSON shapes exactly; `airbridge-core` converts them
// into domain types. Every field the service may omit is defaulted so a
// single sparse device does not invalidate an otherwise good listing.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of a successful `POST /oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: String,
}

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Product descriptor nested in device info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub en_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatus {
    #[serde(default)]
    pub offline: bool,
}

/// The `info` block of a listed device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeviceInfo {
    pub mac: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product: RawProduct,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RawStatus,
}

/// One sensor reading, e.g. `{"value": 23.4}`.
///
/// `value` is kept as raw JSON; numeric validation happens in core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub value: Value,
}

/// A single entry of the `devices` array.
///
/// A `null` data block reads as empty and a `null` reading as `None`, so an
/// idle unit does not invalidate the listing it appears in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDevice {
    pub info: RawDeviceInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: HashMap<String, Option<RawReading>>,
}

/// Result of parsing a device-listing body.
///
/// A listing is all-or-nothing: either every entry of a proper `devices`
/// array parsed, or the payload is reported as malformed and the caller
/// keeps whatever it had before.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceListing {
    Devices {
        total: Option<u64>,
        devices: Vec<RawDevice>,
    },
    Malformed {
        reason: String,
    },
}

impl DeviceListing {
    /// Parse a `GET /v1/apis/devices` response body.
    pub fn from_body(body: &str) -> Self {
        let mut root: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                return Self::Malformed {
                    reason: format!("body is not JSON: {e}"),
                };
            }
        };

        let total = root.get("total").and_then(Value::as_u64);

        match root.get_mut("devices").map(Value::take) {
            Some(items @ Value::Array(_)) => match serde_json::from_value::<Vec<RawDevice>>(items) {
                Ok(devices) => Self::Devices { total, devices },
                Err(e) => Self::Malformed {
                    reason: format!("device entry does not parse: {e}"),
                },
            },
            Some(other) => Self::Malformed {
                reason: format!("`devices` is {} rather than a list", json_kind(&other)),
            },
            None => Self::Malformed {
                reason: "`devices` field is missing".into(),
            },
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
