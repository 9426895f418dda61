// ── Device domain types ──
//
// A `Device` is an immutable snapshot taken from one poll. The whole set
// is replaced on every successful listing; nothing here is merged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ── MacAddress ──────────────────────────────────────────────────────

/// Hardware address, normalized to uppercase hex without separators
/// (`582D34001122`), which is how the cloud API reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw
            .as_ref()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | ' '))
            .collect::<String>()
            .to_uppercase();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// ── ProductId ───────────────────────────────────────────────────────

/// Hardware model, keyed by the numeric product id of the cloud API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ProductId {
    /// Air Monitor (CGS1): temperature, humidity, CO2, PM2.5, TVOC, battery.
    AirMonitor,
    /// Air Monitor Lite (CGDN1): mains powered, no TVOC.
    AirMonitorLite,
    /// Anything this bridge does not know how to expose.
    Other(u32),
}

impl ProductId {
    pub const AIR_MONITOR: u32 = 1201;
    pub const AIR_MONITOR_LITE: u32 = 1203;

    pub fn code(self) -> u32 {
        match self {
            Self::AirMonitor => Self::AIR_MONITOR,
            Self::AirMonitorLite => Self::AIR_MONITOR_LITE,
            Self::Other(id) => id,
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<u32> for ProductId {
    fn from(id: u32) -> Self {
        match id {
            Self::AIR_MONITOR => Self::AirMonitor,
            Self::AIR_MONITOR_LITE => Self::AirMonitorLite,
            other => Self::Other(other),
        }
    }
}

impl From<ProductId> for u32 {
    fn from(id: ProductId) -> Self {
        id.code()
    }
}

// ── Readings ────────────────────────────────────────────────────────

/// Kinds of reading a device may report.
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
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReadingKind {
    Temperature,
    Humidity,
    Co2,
    Tvoc,
    Pm25,
    Battery,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub value: f64,
}

/// Readings reported by one device in one poll. A kind is absent when the
/// model has no such sensor or the cloud did not send a numeric value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Readings(BTreeMap<ReadingKind, SensorReading>);

impl Readings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ReadingKind) -> Option<f64> {
        self.0.get(&kind).map(|r| r.value)
    }

    pub fn contains(&self, kind: ReadingKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn insert(&mut self, kind: ReadingKind, value: f64) {
        self.0.insert(kind, SensorReading { value });
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReadingKind, f64)> + '_ {
        self.0.iter().map(|(k, r)| (*k, r.value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ReadingKind, f64)> for Readings {
    fn from_iter<I: IntoIterator<Item = (ReadingKind, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, value)| (k, SensorReading { value }))
                .collect(),
        )
    }
}

// ── Device ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub mac: MacAddress,
    pub product_id: ProductId,
    pub product_name: String,
    pub display_name: String,
    pub firmware_version: Option<String>,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    pub offline: bool,
}

/// One physical sensor unit as of the latest poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub info: DeviceInfo,
    pub data: Readings,
}

impl Device {
    pub fn mac(&self) -> &MacAddress {
        &self.info.mac
    }
}
