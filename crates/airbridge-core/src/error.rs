// ── Core error types ──
//
// User-facing errors from airbridge-core. Consumers never see reqwest
// errors or HTTP details directly; the `From<airbridge_api::Error>` impl
// translates transport-layer failures into the auth / fetch taxonomy.

use thiserror::Error;

use crate::model::{MacAddress, ReadingKind};

/// A capability read asked for a reading the device did not report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No {kind} reading available")]
pub struct MissingReadingError {
    pub kind: ReadingKind,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote errors ────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Device listing failed: {message}")]
    Fetch {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
        /// Timeout, refused connection, throttling or a 5xx.
        transient: bool,
    },

    #[error("Device listing was malformed: {reason}")]
    MalformedResponse { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error(transparent)]
    MissingReading(#[from] MissingReadingError),

    #[error("Unsupported product {product_id} ({product_name}) on device {mac}")]
    UnsupportedDevice {
        mac: MacAddress,
        product_id: u32,
        product_name: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("A sync cycle is already in progress")]
    SyncInProgress,

    #[error("Accessory cache error: {message}")]
    Cache { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` for failures that leave the previous device set usable,
    /// so a sync cycle can proceed against cached data.
    pub fn keeps_cached_devices(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }

    /// `true` when the cloud is briefly unreachable and the next poll is
    /// likely to succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { transient: true, .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<airbridge_api::Error> for CoreError {
    fn from(err: airbridge_api::Error) -> Self {
        let status = err.status();
        let transient = err.is_transient();
        match err {
            airbridge_api::Error::Authentication { message } => CoreError::Auth { message },
            airbridge_api::Error::Unauthorized => CoreError::Auth {
                message: "access token rejected -- will re-authenticate on next poll".into(),
            },
            airbridge_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            airbridge_api::Error::Transport(e) => CoreError::Fetch {
                message: e.to_string(),
                status,
                transient,
            },
            airbridge_api::Error::Api { message, .. } => CoreError::Fetch {
                message,
                status,
                transient,
            },
        }
    }
}
