// ── Sensor value resolution ──
//
// Maps a device's raw readings onto exposed characteristic values:
// missing-value detection, the optional ppb -> µg/m³ VOC conversion and
// the low-battery threshold.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::MissingReadingError;
use crate::model::{ReadingKind, Readings};

/// ppb -> µg/m³ factor applied to VOC density when the device reports ppb.
pub const PPB_TO_UG_M3: f64 = 3.19;

/// Battery percentages at or below this are reported as low.
pub const LOW_BATTERY_PERCENT: f64 = 20.0;

/// Unit the cloud reports `tvoc` in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TvocUnit {
    /// Pass the value through untouched.
    #[default]
    Native,
    /// Convert to µg/m³ on read.
    Ppb,
}

/// How a reading of exactly zero is treated.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ZeroReading {
    /// Zero is a real measurement (0 °C, 0 µg/m³ pm2.5).
    #[default]
    Present,
    /// Zero means the sensor has not reported yet.
    Missing,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
pub enum BatteryStatus {
    Normal,
    Low,
}

impl BatteryStatus {
    pub fn from_percent(percent: f64) -> Self {
        if percent <= LOW_BATTERY_PERCENT {
            Self::Low
        } else {
            Self::Normal
        }
    }
}

/// Pure reading -> value mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorResolver {
    pub tvoc_unit: TvocUnit,
    pub zero_reading: ZeroReading,
}

impl SensorResolver {
    pub fn new(tvoc_unit: TvocUnit, zero_reading: ZeroReading) -> Self {
        Self {
            tvoc_unit,
            zero_reading,
        }
    }

    /// Resolve one reading, converting units where configured.
    pub fn read(&self, readings: &Readings, kind: ReadingKind) -> Result<f64, MissingReadingError> {
        let value = readings
            .get(kind)
            .filter(|&v| self.is_reported(v))
            .ok_or(MissingReadingError { kind })?;

        Ok(match (kind, self.tvoc_unit) {
            (ReadingKind::Tvoc, TvocUnit::Ppb) => value * PPB_TO_UG_M3,
            _ => value,
        })
    }

    /// The readings that count as reported, in their native units. Under
    /// [`ZeroReading::Missing`] every zero value is dropped.
    pub fn present<'a>(&self, readings: &'a Readings) -> Cow<'a, Readings> {
        match self.zero_reading {
            ZeroReading::Present => Cow::Borrowed(readings),
            ZeroReading::Missing => {
                Cow::Owned(readings.iter().filter(|&(_, v)| self.is_reported(v)).collect())
            }
        }
    }

    fn is_reported(self, value: f64) -> bool {
        self.zero_reading == ZeroReading::Present || value != 0.0
    }

    pub fn battery_status(&self, readings: &Readings) -> Result<BatteryStatus, MissingReadingError> {
        self.read(readings, ReadingKind::Battery)
            .map(BatteryStatus::from_percent)
    }
}
