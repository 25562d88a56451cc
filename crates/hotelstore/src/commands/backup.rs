use super::{list, Backends};
use crate::error::Result;
use crate::model::{BackupSnapshot, BACKUP_VERSION};
use crate::store::{Collection, KeyValueStore};
use tracing::info;

/// Captures both lists through the normal list path and overwrites the
/// single backup slot with them.
pub async fn create<K: KeyValueStore>(backends: &Backends<K>) -> Result<BackupSnapshot> {
    let hotels = list::approved(backends).await;
    let pending_hotels = list::pending(backends).await;
    let snapshot = BackupSnapshot {
        hotels,
        pending_hotels,
        timestamp: backends.clock.now(),
        version: BACKUP_VERSION.to_string(),
    };
    backends.local.write_backup(&snapshot)?;
    info!(
        hotels = snapshot.hotels.len(),
        pending = snapshot.pending_hotels.len(),
        "backup written"
    );
    Ok(snapshot)
}

/// Overwrites the local collections with the stored snapshot. The remote
/// store is never written. `None` when no backup exists.
pub fn restore<K: KeyValueStore>(backends: &Backends<K>) -> Result<Option<BackupSnapshot>> {
    let Some(snapshot) = backends.local.read_backup()? else {
        info!("no backup to restore");
        return Ok(None);
    };
    backends
        .local
        .replace_all(Collection::Hotels, &snapshot.hotels)?;
    backends
        .local
        .replace_all(Collection::PendingHotels, &snapshot.pending_hotels)?;
    info!(taken_at = %snapshot.timestamp, "backup restored");
    Ok(Some(snapshot))
}
