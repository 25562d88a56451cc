//! Live feeds over the approved and pending collections.
//!
//! Remote mode opens a watch on the remote query and mirrors every delivered
//! snapshot into the local store. Local mode, or a watch that can't be
//! opened, polls the local store instead. Either way the caller receives the
//! whole collection, newest first, and a [`SubscriptionHandle`] that the
//! facade also tracks for [`cancel_all`].

use super::list::{approved_filter, docs_to_listings};
use super::{report_fault, Backends};
use crate::error::Result;
use crate::model::sort_newest_first;
use crate::remote::{Document, FieldFilter, RemoteStore, SnapshotCallback};
use crate::store::{Collection, KeyValueStore};
use crate::subscriptions::{ListingsCallback, SubscriptionHandle};
use std::sync::Arc;
use tracing::{debug, info};

struct Feed {
    collection: Collection,
    filter: Option<FieldFilter>,
    op: &'static str,
    mirror_op: &'static str,
}

/// # Panics
///
/// Must be called from within a Tokio runtime when the feed falls back to
/// polling.
pub fn approved<K: KeyValueStore + 'static>(
    backends: &Backends<K>,
    callback: ListingsCallback,
) -> SubscriptionHandle {
    open(
        backends,
        Feed {
            collection: Collection::Hotels,
            filter: Some(approved_filter()),
            op: "subscribe.approved",
            mirror_op: "subscribe.approved.mirror",
        },
        callback,
    )
}

/// # Panics
///
/// See [`approved`].
pub fn pending<K: KeyValueStore + 'static>(
    backends: &Backends<K>,
    callback: ListingsCallback,
) -> SubscriptionHandle {
    open(
        backends,
        Feed {
            collection: Collection::PendingHotels,
            filter: None,
            op: "subscribe.pending",
            mirror_op: "subscribe.pending.mirror",
        },
        callback,
    )
}

/// Cancels every feed opened through `backends`. Returns how many were still
/// tracked.
pub fn cancel_all<K: KeyValueStore>(backends: &Backends<K>) -> usize {
    let cancelled = backends.subscriptions.cancel_all();
    debug!(cancelled, "unsubscribed all feeds");
    cancelled
}

fn open<K: KeyValueStore + 'static>(
    backends: &Backends<K>,
    feed: Feed,
    callback: ListingsCallback,
) -> SubscriptionHandle {
    let collection = feed.collection;
    let watched = backends.remote().and_then(|remote| {
        let op = feed.op;
        watch_remote(backends, remote, feed, Arc::clone(&callback))
            .map_err(|e| backends.fault(op, &e))
            .ok()
    });

    let handle = match watched {
        Some(handle) => handle,
        None => {
            info!(%collection, interval = ?backends.poll_interval, "polling local store");
            backends
                .local
                .poll(collection, backends.poll_interval, move |mut listings| {
                    sort_newest_first(&mut listings);
                    callback(listings);
                })
        }
    };
    backends.subscriptions.track(handle.clone());
    handle
}

fn watch_remote<K: KeyValueStore + 'static>(
    backends: &Backends<K>,
    remote: &dyn RemoteStore,
    feed: Feed,
    callback: ListingsCallback,
) -> Result<SubscriptionHandle> {
    let Feed {
        collection,
        filter,
        op,
        mirror_op,
    } = feed;
    let local = Arc::clone(&backends.local);
    let hook = backends.error_hook.clone();

    let on_snapshot: SnapshotCallback = Arc::new(move |docs: Vec<Document>| {
        match docs_to_listings(&docs) {
            Ok(listings) => {
                if let Err(e) = local.replace_all(collection, &listings) {
                    report_fault(hook.as_ref(), mirror_op, &e);
                }
                callback(listings);
            }
            Err(e) => report_fault(hook.as_ref(), op, &e),
        }
    });

    let handle = remote.watch(collection, filter, on_snapshot)?;
    debug!(%collection, subscription = handle.id(), "remote watch opened");
    Ok(handle)
}
