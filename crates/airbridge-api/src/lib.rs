// airbridge-api: Async Rust client for the cloud air-monitor API

pub mod auth;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use auth::{AppCredentials, Credential, DEVICE_SCOPE, TokenManager};
pub use client::CloudClient;
pub use error::Error;
pub use transport::TransportConfig;
pub use types::{
    DeviceListing, RawDevice, RawDeviceInfo, RawProduct, RawReading, RawStatus, TokenResponse,
};
