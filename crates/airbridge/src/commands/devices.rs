//! One-shot device listing with resolved values.

use serde::Serialize;
use tabled::Tabled;

use airbridge_core::{
    AirQualityClassifier, AirQualityLevel, BatteryStatus, Device, DeviceClient, ReadingKind,
    SensorResolver,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Views ───────────────────────────────────────────────────────────

/// A device as presented: identity plus values the way an accessory
/// would report them. Readings that are missing stay `None`.
#[derive(Debug, Serialize)]
struct DeviceView {
    mac: String,
    name: String,
    product: String,
    product_id: u32,
    supported: bool,
    offline: bool,
    temperature: Option<f64>,
    humidity: Option<f64>,
    co2: Option<f64>,
    pm25: Option<f64>,
    tvoc: Option<f64>,
    battery: Option<f64>,
    battery_status: Option<BatteryStatus>,
    air_quality: AirQualityLevel,
}

impl DeviceView {
    fn new(device: &Device, resolver: &SensorResolver, classifier: &AirQualityClassifier) -> Self {
        let read = |kind| resolver.read(&device.data, kind).ok();
        let info = &device.info;
        Self {
            mac: info.mac.to_string(),
            name: info.display_name.clone(),
            product: info.product_name.clone(),
            product_id: info.product_id.code(),
            supported: info.product_id.is_supported(),
            offline: info.offline,
            temperature: read(ReadingKind::Temperature),
            humidity: read(ReadingKind::Humidity),
            co2: read(ReadingKind::Co2),
            pm25: read(ReadingKind::Pm25),
            tvoc: read(ReadingKind::Tvoc),
            battery: read(ReadingKind::Battery),
            battery_status: resolver.battery_status(&device.data).ok(),
            air_quality: classifier.classify(&resolver.present(&device.data)),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Temp °C")]
    temperature: String,
    #[tabled(rename = "RH %")]
    humidity: String,
    #[tabled(rename = "CO2")]
    co2: String,
    #[tabled(rename = "PM2.5")]
    pm25: String,
    #[tabled(rename = "TVOC")]
    tvoc: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Air Quality")]
    air_quality: String,
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v}"))
}

impl From<&DeviceView> for DeviceRow {
    fn from(v: &DeviceView) -> Self {
        let state = match (v.supported, v.offline) {
            (false, _) => "unsupported",
            (true, true) => "offline",
            (true, false) => "online",
        };
        let battery = match (v.battery, v.battery_status) {
            (Some(pct), Some(BatteryStatus::Low)) => format!("{pct} (low)"),
            (pct, _) => cell(pct),
        };
        Self {
            mac: v.mac.clone(),
            name: v.name.clone(),
            product: v.product.clone(),
            state: state.into(),
            temperature: cell(v.temperature),
            humidity: cell(v.humidity),
            co2: cell(v.co2),
            pm25: cell(v.pm25),
            tvoc: cell(v.tvoc),
            battery,
            air_quality: v.air_quality.to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::load_settings(global)?;
    let bridge = super::bridge_config(global, &cfg)?;

    let client = DeviceClient::from_config(&bridge)?;
    let count = client.update_devices().await?;
    tracing::debug!(count, "devices fetched");

    let resolver = bridge.resolver();
    let classifier = AirQualityClassifier::default();
    let views: Vec<DeviceView> = client
        .devices()
        .iter()
        .map(|d| DeviceView::new(d, &resolver, &classifier))
        .collect();

    let out = output::render_list(
        global.output,
        &views,
        |v: &DeviceView| DeviceRow::from(v),
        |v| v.mac.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
