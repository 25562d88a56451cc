//! # hotelstore
//!
//! Storage for hotel listings that keeps working whether or not a remote
//! document database is reachable.
//!
//! ## Architecture
//!
//! ```text
//! caller ──► api::HotelStorage ──► commands/* ──┬─► remote::RemoteStore   (when available)
//!                                                └─► store::LocalStore    (fallback + mirror)
//! ```
//!
//! - [`api`]: the facade. Thin, dispatch only.
//! - [`commands`]: one module per operation, holding the remote-first,
//!   local-fallback rules.
//! - [`remote`]: the document-store seam and an in-memory implementation.
//! - [`store`]: the key/value primitive and the collection store built on it.
//! - [`subscriptions`]: cancel-once handles for live feeds and their registry.
//! - [`availability`]: the one-shot remote/local decision.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hotelstore::{HotelStorage, MemKv, StorageConfig};
//! use serde_json::json;
//!
//! # async fn demo() -> hotelstore::Result<()> {
//! let storage = HotelStorage::new(MemKv::new(), None, &StorageConfig::default());
//! let fields = match json!({"name": "Lake View Inn", "rate": 100}) {
//!     serde_json::Value::Object(map) => map,
//!     _ => unreachable!(),
//! };
//! let listing = storage.add_hotel(fields).await?;
//! storage.approve_hotel(&listing.id).await?;
//! assert_eq!(storage.get_approved_hotels().await.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod availability;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod store;
pub mod subscriptions;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use api::HotelStorage;
pub use availability::Availability;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StorageConfig;
pub use error::{ErrorHook, Result, StorageFault, StoreError};
pub use model::{BackupSnapshot, Fields, Listing, ListingId, ListingStatus, MigrationReport};
pub use remote::memory::MemoryRemote;
pub use remote::RemoteStore;
pub use store::fs_kv::FsKv;
pub use store::mem_kv::MemKv;
pub use store::{Collection, KeyValueStore};
pub use subscriptions::SubscriptionHandle;
