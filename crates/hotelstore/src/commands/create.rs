use super::{read_back, Backends};
use crate::error::Result;
use crate::model::{field, Fields, Listing, ListingId, ListingStatus};
use crate::remote::{RemoteStore, Write};
use crate::store::{Collection, KeyValueStore};
use tracing::debug;

/// Adds a new listing to the pending collection.
///
/// Caller values for `id` and the lifecycle keys are discarded. The returned
/// listing carries a remote id when the remote insert succeeded, otherwise a
/// local millisecond id.
pub async fn run<K: KeyValueStore>(backends: &Backends<K>, fields: Fields) -> Result<Listing> {
    let mut draft = Listing::new(ListingId::Local(0), fields);
    draft.set_status(ListingStatus::Pending);

    if let Some(remote) = backends.remote() {
        match create_remote(backends, remote, &draft).await {
            Ok(listing) => {
                let mirrored = listing.to_fields().and_then(|body| {
                    backends
                        .local
                        .append(Collection::PendingHotels, body, Some(listing.id.clone()))
                });
                backends.mirror("create.mirror", mirrored);
                return Ok(listing);
            }
            Err(e) => backends.fault("create", &e),
        }
    }

    let now = backends.clock.now();
    draft.set_created_at(now);
    draft.set_updated_at(now);
    let listing = backends
        .local
        .append(Collection::PendingHotels, draft.to_fields()?, None)?;
    debug!(id = %listing.id, "created pending listing locally");
    Ok(listing)
}

async fn create_remote<K: KeyValueStore>(
    backends: &Backends<K>,
    remote: &dyn RemoteStore,
    draft: &Listing,
) -> Result<Listing> {
    let write = Write::new(draft.to_fields()?)
        .stamp(field::CREATED_AT)
        .stamp(field::UPDATED_AT);
    let id = remote.insert(Collection::PendingHotels, write).await?;
    debug!(%id, "created pending listing remotely");

    let mut known = draft.clone();
    known.id = ListingId::Remote(id.clone());
    let now = backends.clock.now();
    known.set_created_at(now);
    known.set_updated_at(now);
    Ok(read_back(remote, Collection::PendingHotels, &id, known).await)
}
