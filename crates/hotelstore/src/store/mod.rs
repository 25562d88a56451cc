//! # Local Storage Layer
//!
//! The local side of the store is a plain key/value primitive with
//! **whole-value overwrite** semantics, modelled on browser `localStorage`.
//! [`KeyValueStore`] handles the "how" (memory vs disk) while
//! [`local::LocalStore`] handles the "what" (collections, ids, moves, backup).
//!
//! ## Keys
//!
//! | Key             | Content                                  |
//! |-----------------|------------------------------------------|
//! | `hotels`        | JSON array of approved listings          |
//! | `pendingHotels` | JSON array of pending listings           |
//! | `hotelBackup`   | Single [`crate::model::BackupSnapshot`]  |
//!
//! Every write replaces the full array for a key, so readers always observe a
//! complete snapshot of a collection, never a partial one.
//!
//! ## Implementations
//!
//! - [`fs_kv::FsKv`]: one file per key in a directory, written atomically.
//! - [`mem_kv::MemKv`]: in-memory, for tests and ephemeral sessions.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod fs_kv;
pub mod local;
pub mod mem_kv;

/// Key under which the single backup snapshot lives.
pub const BACKUP_KEY: &str = "hotelBackup";

/// Logical collections shared by the remote and local stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Approved listings.
    Hotels,
    /// Listings awaiting approval.
    PendingHotels,
    /// Registered hotel-owner accounts. Only the remote store knows it.
    HotelUsers,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Hotels => "hotels",
            Collection::PendingHotels => "pendingHotels",
            Collection::HotelUsers => "hotelUsers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Synchronous string key/value storage.
///
/// `set` MUST replace the whole value atomically: a concurrent or later `get`
/// sees either the previous value or the new one.
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<K> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}
