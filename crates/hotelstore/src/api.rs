//! # API Facade
//!
//! [`HotelStorage`] is a **thin facade** over the command layer and the single
//! entry point for every listing operation, whatever the caller (CLI, a
//! service, tests).
//!
//! ## Role and Responsibilities
//!
//! The facade:
//! - **Owns** the backends: the local store, the optional remote handle, the
//!   cached [`Availability`] and the subscription registry
//! - **Dispatches** each call to its `commands/*.rs` function
//! - **Returns structured types**, never strings
//!
//! Business logic, and in particular the remote/local fallback rules, lives in
//! [`crate::commands`].
//!
//! ## Construction
//!
//! Dependencies are injected: a [`KeyValueStore`] for local persistence, an
//! optional [`RemoteStore`] handle and a [`StorageConfig`]. Tests also inject a
//! [`Clock`] through [`HotelStorage::with_clock`].
//!
//! The remote/local decision is taken once, here, and kept for the facade's
//! lifetime.
//!
//! ## Observability
//!
//! Masked failures never reach the caller. They are logged through `tracing`
//! and, when installed with [`HotelStorage::with_error_hook`], handed to a
//! callback as a [`StorageFault`].
//!
//! ## Generic Over KeyValueStore
//!
//! - Production: `HotelStorage<FsKv>`
//! - Testing: `HotelStorage<MemKv>`

use crate::availability::Availability;
use crate::clock::{Clock, SystemClock};
use crate::commands::{self, Backends};
use crate::config::StorageConfig;
use crate::error::{Result, StorageFault};
use crate::model::{BackupSnapshot, Fields, Listing, ListingId, MigrationReport};
use crate::remote::RemoteStore;
use crate::store::local::LocalStore;
use crate::store::KeyValueStore;
use crate::subscriptions::{ListingsCallback, SubscriptionHandle};
use std::sync::Arc;

/// The listing store facade.
///
/// Dropping it cancels every subscription it opened.
pub struct HotelStorage<K: KeyValueStore + 'static> {
    backends: Backends<K>,
}

impl<K: KeyValueStore + 'static> HotelStorage<K> {
    pub fn new(kv: K, remote: Option<Arc<dyn RemoteStore>>, config: &StorageConfig) -> Self {
        Self::with_clock(kv, remote, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        kv: K,
        remote: Option<Arc<dyn RemoteStore>>,
        config: &StorageConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let availability = Availability::detect(remote.as_deref(), config.force_local);
        Self {
            backends: Backends::new(kv, remote, availability, clock, config.poll_interval()),
        }
    }

    /// Installs a callback that sees every failure the facade recovers from.
    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StorageFault<'_>) + Send + Sync + 'static,
    {
        self.backends.error_hook = Some(Arc::new(hook));
        self
    }

    pub fn availability(&self) -> Availability {
        self.backends.availability
    }

    /// The local fallback store, for inspection.
    pub fn local(&self) -> &LocalStore<K> {
        &self.backends.local
    }

    pub async fn add_hotel(&self, fields: Fields) -> Result<Listing> {
        commands::create::run(&self.backends, fields).await
    }

    pub async fn approve_hotel(&self, id: &ListingId) -> Result<Option<Listing>> {
        commands::approve::run(&self.backends, id).await
    }

    pub async fn reject_hotel(&self, id: &ListingId) -> Result<()> {
        commands::reject::run(&self.backends, id).await
    }

    pub async fn get_approved_hotels(&self) -> Vec<Listing> {
        commands::list::approved(&self.backends).await
    }

    pub async fn get_pending_hotels(&self) -> Vec<Listing> {
        commands::list::pending(&self.backends).await
    }

    pub async fn update_hotel(&self, id: &ListingId, patch: Fields) -> Result<()> {
        commands::update::run(&self.backends, id, patch).await
    }

    pub async fn delete_hotel(&self, id: &ListingId) -> Result<()> {
        commands::delete::run(&self.backends, id).await
    }

    /// Live feed of approved listings. Falls back to polling the local
    /// store; must be called from within a Tokio runtime.
    pub fn subscribe_to_hotels<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(Vec<Listing>) + Send + Sync + 'static,
    {
        let callback: ListingsCallback = Arc::new(callback);
        commands::subscribe::approved(&self.backends, callback)
    }

    /// Live feed of pending listings. See [`Self::subscribe_to_hotels`].
    pub fn subscribe_to_pending_hotels<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(Vec<Listing>) + Send + Sync + 'static,
    {
        let callback: ListingsCallback = Arc::new(callback);
        commands::subscribe::pending(&self.backends, callback)
    }

    pub fn unsubscribe_all(&self) -> usize {
        commands::subscribe::cancel_all(&self.backends)
    }

    pub async fn create_backup(&self) -> Result<BackupSnapshot> {
        commands::backup::create(&self.backends).await
    }

    pub async fn restore_from_backup(&self) -> Result<Option<BackupSnapshot>> {
        commands::backup::restore(&self.backends)
    }

    pub async fn migrate_to_remote(&self) -> Result<MigrationReport> {
        commands::migrate::run(&self.backends).await
    }
}
