// ── Polled state ──

mod devices;

pub use devices::{DeviceClient, DeviceSet};
