use super::Backends;
use crate::error::Result;
use crate::model::{field, sort_newest_first, Listing, ListingStatus};
use crate::remote::{Document, FieldFilter, RemoteStore};
use crate::store::{Collection, KeyValueStore};
use tracing::debug;

/// Approved listings, newest first. Never fails: when the remote query does,
/// the locally cached copy is returned.
pub async fn approved<K: KeyValueStore>(backends: &Backends<K>) -> Vec<Listing> {
    fetch(
        backends,
        Collection::Hotels,
        Some(approved_filter()),
        ("list.approved", "list.approved.mirror"),
    )
    .await
}

/// Pending listings, newest first. Same fallback as [`approved`].
pub async fn pending<K: KeyValueStore>(backends: &Backends<K>) -> Vec<Listing> {
    fetch(
        backends,
        Collection::PendingHotels,
        None,
        ("list.pending", "list.pending.mirror"),
    )
    .await
}

pub(crate) fn approved_filter() -> FieldFilter {
    FieldFilter::eq(field::STATUS, ListingStatus::Approved.as_str())
}

async fn fetch<K: KeyValueStore>(
    backends: &Backends<K>,
    collection: Collection,
    filter: Option<FieldFilter>,
    (op, mirror_op): (&'static str, &'static str),
) -> Vec<Listing> {
    if let Some(remote) = backends.remote() {
        match query_sorted(remote, collection, filter.as_ref()).await {
            Ok(listings) => {
                backends.mirror(mirror_op, backends.local.replace_all(collection, &listings));
                debug!(%collection, count = listings.len(), "listed remotely");
                return listings;
            }
            Err(e) => backends.fault(op, &e),
        }
    }

    let mut listings = backends.local.get_all(collection);
    sort_newest_first(&mut listings);
    listings
}

async fn query_sorted(
    remote: &dyn RemoteStore,
    collection: Collection,
    filter: Option<&FieldFilter>,
) -> Result<Vec<Listing>> {
    let docs = remote.query(collection, filter).await?;
    docs_to_listings(&docs)
}

/// Converts a remote result set and orders it newest first.
pub(crate) fn docs_to_listings(docs: &[Document]) -> Result<Vec<Listing>> {
    let mut listings = docs
        .iter()
        .map(|doc| Listing::from_document(&doc.id, &doc.fields))
        .collect::<Result<Vec<_>>>()?;
    sort_newest_first(&mut listings);
    Ok(listings)
}
