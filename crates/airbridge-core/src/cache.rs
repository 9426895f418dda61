// ── Persisted accessory cache ──
//
// Accessories known at shutdown are written to a JSON file so the next
// start can restore them without re-registering everything with the host.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{AccessoryRecord, Device};

const CACHE_VERSION: u32 = 1;

/// One accessory as persisted: its id and the last bound device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAccessory {
    pub id: Uuid,
    pub device: Device,
}

impl CachedAccessory {
    pub fn from_record(record: &AccessoryRecord) -> Self {
        Self {
            id: record.id,
            device: Device::clone(&record.device()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    accessories: Vec<CachedAccessory>,
}

/// JSON file holding the cached accessory set.
#[derive(Debug, Clone)]
pub struct AccessoryCache {
    path: PathBuf,
}

impl AccessoryCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache. A missing file is an empty cache.
    pub fn load(&self) -> Result<Vec<CachedAccessory>, CoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no accessory cache yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.error("read", &e)),
        };

        let file: CacheFile = serde_json::from_str(&raw).map_err(|e| self.error("parse", &e))?;
        if file.version != CACHE_VERSION {
            return Err(CoreError::Cache {
                message: format!(
                    "{}: unsupported cache version {} (expected {CACHE_VERSION})",
                    self.path.display(),
                    file.version
                ),
            });
        }
        Ok(file.accessories)
    }

    /// Replace the cache with `accessories`.
    ///
    /// Writes a sibling temp file and renames it over the target, so a
    /// crash mid-write leaves the previous cache readable.
    pub fn save(&self, accessories: &[CachedAccessory]) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error("create directory for", &e))?;
        }

        let file = CacheFile {
            version: CACHE_VERSION,
            accessories: accessories.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| self.error("encode", &e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.error("write", &e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.error("replace", &e))?;

        debug!(path = %self.path.display(), count = accessories.len(), "accessory cache saved");
        Ok(())
    }

    fn error(&self, action: &str, err: &dyn std::fmt::Display) -> CoreError {
        CoreError::Cache {
            message: format!("failed to {action} {}: {err}", self.path.display()),
        }
    }
}
