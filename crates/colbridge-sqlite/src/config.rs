use colbridge_core::{HostZone, LoadOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the database lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SqliteLocation {
    #[default]
    Memory,
    Path { path: PathBuf },
    /// A `file:` URI, opened with `SQLITE_OPEN_URI`.
    Uri { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SqliteConfig {
    pub location: SqliteLocation,
    pub busy_timeout_ms: u64,
    /// Session zone used to render and parse `date`/`timestamp` values.
    pub host_zone: HostZone,
    pub load: LoadOptions,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            location: SqliteLocation::Memory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            host_zone: HostZone::Local,
            load: LoadOptions::default(),
        }
    }
}

impl SqliteConfig {
    pub fn in_memory(host_zone: HostZone) -> Self {
        Self {
            host_zone,
            ..Self::default()
        }
    }

    pub fn at_path(path: impl Into<PathBuf>, host_zone: HostZone) -> Self {
        Self {
            location: SqliteLocation::Path { path: path.into() },
            host_zone,
            ..Self::default()
        }
    }
}
