//! # Command Layer
//!
//! This module contains the **core logic** of the store. Each operation lives in
//! its own submodule as plain async functions over [`Backends`].
//!
//! ## Dispatch Rule
//!
//! Every command follows the same shape:
//!
//! 1. Check the cached [`Availability`]. In local mode go straight to step 3.
//! 2. Run the remote variant. On success, mirror the result into the local
//!    store and return it. On failure, report a [`StorageFault`] and continue.
//! 3. Run the local variant and return its result.
//!
//! A failed mirror write after a successful remote call is reported, never
//! returned: the caller's operation did succeed. Only a local failure on the
//! path that actually served the call reaches the caller.
//!
//! ## Testing Strategy
//!
//! **This is where most of the tests live.** Command tests build [`Backends`]
//! over `MemKv` and `MemoryRemote` with a `ManualClock` and exercise both the
//! remote path and every fallback.
//!
//! ## Command Modules
//!
//! - [`create`]: add a pending listing
//! - [`approve`]: move pending → approved
//! - [`reject`]: drop a pending listing
//! - [`list`]: approved / pending listings, newest first
//! - [`update`]: patch an approved listing
//! - [`delete`]: drop an approved listing
//! - [`subscribe`]: live feeds with polling fallback
//! - [`backup`]: single-slot snapshot and restore
//! - [`migrate`]: copy local collections into the remote store

use crate::availability::Availability;
use crate::clock::Clock;
use crate::error::{ErrorHook, Result, StorageFault, StoreError};
use crate::model::{Listing, ListingId};
use crate::remote::RemoteStore;
use crate::store::local::LocalStore;
use crate::store::KeyValueStore;
use crate::subscriptions::SubscriptionRegistry;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

pub mod approve;
pub mod backup;
pub mod create;
pub mod delete;
pub mod list;
pub mod migrate;
pub mod reject;
pub mod subscribe;
pub mod update;

/// Everything a command needs: both stores, the cached mode and the shared
/// bookkeeping of one facade instance.
pub struct Backends<K: KeyValueStore> {
    pub(crate) local: Arc<LocalStore<K>>,
    pub(crate) remote: Option<Arc<dyn RemoteStore>>,
    pub(crate) availability: Availability,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) poll_interval: Duration,
    pub(crate) error_hook: Option<ErrorHook>,
    pub(crate) subscriptions: SubscriptionRegistry,
    approvals_in_flight: Mutex<HashSet<ListingId>>,
}

impl<K: KeyValueStore> Backends<K> {
    pub fn new(
        kv: K,
        remote: Option<Arc<dyn RemoteStore>>,
        availability: Availability,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            local: Arc::new(LocalStore::new(kv, Arc::clone(&clock))),
            remote,
            availability,
            clock,
            poll_interval,
            error_hook: None,
            subscriptions: SubscriptionRegistry::new(),
            approvals_in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The remote store, but only when this instance runs in remote mode.
    pub(crate) fn remote(&self) -> Option<&dyn RemoteStore> {
        if self.availability.is_remote() {
            self.remote.as_deref()
        } else {
            None
        }
    }

    pub(crate) fn fault(&self, operation: &'static str, error: &StoreError) {
        report_fault(self.error_hook.as_ref(), operation, error);
    }

    /// Swallows a mirror-write failure after reporting it.
    pub(crate) fn mirror<T>(&self, operation: &'static str, result: Result<T>) {
        if let Err(e) = result {
            self.fault(operation, &e);
        }
    }

    /// Settles an operation that always writes locally. A local failure is
    /// only returned when the remote write did not succeed either.
    pub(crate) fn settle(
        &self,
        operation: &'static str,
        remote_ok: bool,
        local: Result<()>,
    ) -> Result<()> {
        match local {
            Err(e) if remote_ok => {
                self.fault(operation, &e);
                Ok(())
            }
            other => other,
        }
    }

    /// Marks `id` as being approved. `None` if another approval of the same
    /// id is still running on this instance.
    pub(crate) fn claim_approval(&self, id: &ListingId) -> Option<ApprovalClaim<'_>> {
        let mut in_flight = self
            .approvals_in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(id.clone()) {
            return None;
        }
        Some(ApprovalClaim {
            in_flight: &self.approvals_in_flight,
            id: id.clone(),
        })
    }
}

pub(crate) struct ApprovalClaim<'a> {
    in_flight: &'a Mutex<HashSet<ListingId>>,
    id: ListingId,
}

impl Drop for ApprovalClaim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

pub(crate) fn report_fault(hook: Option<&ErrorHook>, operation: &'static str, error: &StoreError) {
    warn!(operation, error = %error, "recovered from storage failure");
    if let Some(hook) = hook {
        hook(&StorageFault { operation, error });
    }
}

/// Re-reads a freshly written document so server-assigned fields are
/// visible, falling back to what the client knows.
pub(crate) async fn read_back(
    remote: &dyn RemoteStore,
    collection: crate::store::Collection,
    id: &str,
    fallback: Listing,
) -> Listing {
    match remote.get(collection, id).await {
        Ok(Some(doc)) => Listing::from_document(&doc.id, &doc.fields).unwrap_or(fallback),
        _ => fallback,
    }
}
