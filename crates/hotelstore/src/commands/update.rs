use super::Backends;
use crate::error::Result;
use crate::model::{field, Fields, ListingId};
use crate::remote::Write;
use crate::store::{Collection, KeyValueStore};
use tracing::debug;

/// Merges `patch` into an approved listing and refreshes `updatedAt`.
///
/// The patch is applied to the local copy whatever the remote outcome. The
/// id and the lifecycle keys can't be patched, so an approved listing stays
/// approved.
pub async fn run<K: KeyValueStore>(
    backends: &Backends<K>,
    id: &ListingId,
    mut patch: Fields,
) -> Result<()> {
    for key in [
        field::ID,
        field::STATUS,
        field::CREATED_AT,
        field::UPDATED_AT,
        field::APPROVED_AT,
    ] {
        patch.remove(key);
    }

    let mut remote_ok = false;
    if let Some(remote) = backends.remote() {
        let write = Write::new(patch.clone()).stamp(field::UPDATED_AT);
        match remote.update(Collection::Hotels, &id.to_string(), write).await {
            Ok(()) => remote_ok = true,
            Err(e) => backends.fault("update", &e),
        }
    }

    patch.insert(
        field::UPDATED_AT.to_string(),
        serde_json::to_value(backends.clock.now())?,
    );
    let local = backends.local.update(Collection::Hotels, id, &patch);
    debug!(%id, remote_ok, "updated approved listing");
    backends.settle("update.mirror", remote_ok, local)
}
