use super::{read_back, Backends};
use crate::error::Result;
use crate::model::{field, Listing, ListingId, ListingStatus};
use crate::remote::{RemoteStore, Write};
use crate::store::{Collection, KeyValueStore};
use tracing::debug;

/// Moves a pending listing into the approved collection.
///
/// Returns `Ok(None)` when `id` is not pending, or when another approval of
/// the same id is already running on this instance. A remote approval
/// assigns the approved copy a new id; a local one keeps the id.
pub async fn run<K: KeyValueStore>(
    backends: &Backends<K>,
    id: &ListingId,
) -> Result<Option<Listing>> {
    let Some(_claim) = backends.claim_approval(id) else {
        debug!(%id, "approval already in flight");
        return Ok(None);
    };

    if let Some(remote) = backends.remote() {
        match approve_remote(backends, remote, id).await {
            Ok(Some(approved)) => {
                let mirrored = approved
                    .to_fields()
                    .and_then(|body| {
                        backends
                            .local
                            .append(Collection::Hotels, body, Some(approved.id.clone()))
                    })
                    .and_then(|_| backends.local.remove(Collection::PendingHotels, id));
                backends.mirror("approve.mirror", mirrored);
                return Ok(Some(approved));
            }
            // Local ids only exist in the fallback store, so a remote miss
            // still has to look there.
            Ok(None) if !matches!(id, ListingId::Local(_)) => {
                debug!(%id, "approve: no such pending listing");
                return Ok(None);
            }
            Ok(None) => {}
            Err(e) => backends.fault("approve", &e),
        }
    }

    backends.local.move_approve(id)
}

async fn approve_remote<K: KeyValueStore>(
    backends: &Backends<K>,
    remote: &dyn RemoteStore,
    id: &ListingId,
) -> Result<Option<Listing>> {
    let key = id.to_string();
    let Some(doc) = remote.get(Collection::PendingHotels, &key).await? else {
        return Ok(None);
    };

    let mut approved = Listing::from_document(&doc.id, &doc.fields)?;
    approved.set_status(ListingStatus::Approved);
    let write = Write::new(approved.to_fields()?)
        .stamp(field::APPROVED_AT)
        .stamp(field::UPDATED_AT);
    let new_id = remote.insert(Collection::Hotels, write).await?;

    if let Err(e) = remote.delete(Collection::PendingHotels, &key).await {
        // Never leave the listing in both collections.
        if let Err(undo) = remote.delete(Collection::Hotels, &new_id).await {
            backends.fault("approve.undo", &undo);
        }
        return Err(e);
    }
    debug!(pending = %key, approved = %new_id, "approved listing remotely");

    let now = backends.clock.now();
    approved.id = ListingId::Remote(new_id.clone());
    approved.set_approved_at(now);
    approved.set_updated_at(now);
    Ok(Some(
        read_back(remote, Collection::Hotels, &new_id, approved).await,
    ))
}
