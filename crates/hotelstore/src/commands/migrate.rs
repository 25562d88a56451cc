use super::Backends;
use crate::error::{Result, StoreError};
use crate::model::{field, Listing, MigrationReport};
use crate::remote::{RemoteStore, Write};
use crate::store::{Collection, KeyValueStore};
use tracing::info;

/// Copies every local pending and approved listing into the matching remote
/// collection, one at a time.
///
/// Each copy carries `originalId` and a server-stamped `migratedAt`.
/// Per-record failures are counted in the report, never returned. Fails with
/// [`StoreError::RemoteUnavailable`] when this instance runs in local mode.
pub async fn run<K: KeyValueStore>(backends: &Backends<K>) -> Result<MigrationReport> {
    let remote = backends.remote().ok_or(StoreError::RemoteUnavailable)?;
    let mut report = MigrationReport::default();

    for collection in [Collection::PendingHotels, Collection::Hotels] {
        for listing in backends.local.get_all(collection) {
            match migrate_one(remote, collection, &listing).await {
                Ok(_) => report.migrated_count += 1,
                Err(e) => {
                    backends.fault("migrate", &e);
                    report.error_count += 1;
                    report
                        .errors
                        .push(format!("{}/{}: {}", collection, listing.id, e));
                }
            }
        }
    }

    info!(
        migrated = report.migrated_count,
        failed = report.error_count,
        "migration finished"
    );
    Ok(report)
}

async fn migrate_one(
    remote: &dyn RemoteStore,
    collection: Collection,
    listing: &Listing,
) -> Result<String> {
    let mut body = listing.to_fields()?;
    body.insert(
        field::ORIGINAL_ID.to_string(),
        serde_json::to_value(&listing.id)?,
    );
    remote
        .insert(collection, Write::new(body).stamp(field::MIGRATED_AT))
        .await
}
