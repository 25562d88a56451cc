use super::Backends;
use crate::error::Result;
use crate::model::ListingId;
use crate::store::{Collection, KeyValueStore};
use tracing::debug;

/// Drops an approved listing. Unknown ids succeed quietly.
pub async fn run<K: KeyValueStore>(backends: &Backends<K>, id: &ListingId) -> Result<()> {
    let mut remote_ok = false;
    if let Some(remote) = backends.remote() {
        match remote.delete(Collection::Hotels, &id.to_string()).await {
            Ok(()) => remote_ok = true,
            Err(e) => backends.fault("delete", &e),
        }
    }

    let local = backends.local.remove(Collection::Hotels, id);
    debug!(%id, remote_ok, "deleted approved listing");
    backends.settle("delete.mirror", remote_ok, local)
}
