//! # Configuration
//!
//! Store configuration is a [`confique`] config, resolved in priority order:
//! 1. **Environment variables**: `HOTELSTORE_POLL_INTERVAL_MS`, `HOTELSTORE_FORCE_LOCAL`,
//!    `HOTELSTORE_DATA_DIR`.
//! 2. **Config file**: `hotelstore.toml` (path chosen by the embedding binary).
//! 3. **Compiled Defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key                | Default | Description                                        |
//! |--------------------|---------|----------------------------------------------------|
//! | `poll_interval_ms` | `5000`  | Local polling period when live queries are missing |
//! | `force_local`      | `false` | Ignore any remote store and run local-only         |
//! | `data_dir`         | none    | Directory for the file-backed local store          |

use crate::error::{Result, StoreError};
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "hotelstore.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Period of the local polling fallback for subscriptions, in milliseconds.
    #[config(default = 5000, env = "HOTELSTORE_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Run local-only even when a remote store is supplied.
    #[config(default = false, env = "HOTELSTORE_FORCE_LOCAL")]
    pub force_local: bool,

    /// Where the file-backed local store keeps its keys.
    #[config(env = "HOTELSTORE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            force_local: false,
            data_dir: None,
        }
    }
}

impl StorageConfig {
    /// Loads env overrides layered over an optional TOML file.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(file) = file {
            builder = builder.file(file);
        }
        builder
            .load()
            .map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
