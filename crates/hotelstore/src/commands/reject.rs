use super::Backends;
use crate::error::Result;
use crate::model::ListingId;
use crate::store::{Collection, KeyValueStore};
use tracing::debug;

/// Drops a pending listing. Unknown ids succeed quietly.
pub async fn run<K: KeyValueStore>(backends: &Backends<K>, id: &ListingId) -> Result<()> {
    let mut remote_ok = false;
    if let Some(remote) = backends.remote() {
        match remote.delete(Collection::PendingHotels, &id.to_string()).await {
            Ok(()) => remote_ok = true,
            Err(e) => backends.fault("reject", &e),
        }
    }

    let local = backends.local.remove(Collection::PendingHotels, id);
    debug!(%id, remote_ok, "rejected pending listing");
    backends.settle("reject.mirror", remote_ok, local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create;
    use crate::commands::testing::{fields, local_harness, remote_harness};
    use serde_json::json;

    #[tokio::test]
    async fn remote_reject_removes_both_copies() {
        let h = remote_harness();
        let pending = create::run(&h.backends, fields(json!({"name": "A"})))
            .await
            .unwrap();

        run(&h.backends, &pending.id).await.unwrap();

        assert!(h.remote.is_empty(Collection::PendingHotels));
        assert!(h.backends.local.get_all(Collection::PendingHotels).is_empty());
    }

    #[tokio::test]
    async fn remote_failure_still_removes_locally() {
        let h = remote_harness();
        let pending = create::run(&h.backends, fields(json!({"name": "A"})))
            .await
            .unwrap();
        h.remote.fail_next_deletes(1);

        run(&h.backends, &pending.id).await.unwrap();

        assert_eq!(h.remote.len(Collection::PendingHotels), 1);
        assert!(h.backends.local.get_all(Collection::PendingHotels).is_empty());
        assert_eq!(h.fault_ops(), vec!["reject"]);
    }

    #[tokio::test]
    async fn unknown_id_is_quiet() {
        let h = local_harness();
        run(&h.backends, &ListingId::Local(42)).await.unwrap();
        assert!(h.fault_ops().is_empty());
    }

    #[tokio::test]
    async fn local_write_failure_only_surfaces_without_remote_success() {
        let h = local_harness();
        let pending = create::run(&h.backends, fields(json!({"name": "A"})))
            .await
            .unwrap();
        h.backends.local.kv().set_simulate_write_error(true);
        assert!(run(&h.backends, &pending.id).await.is_err());

        let h = remote_harness();
        let pending = create::run(&h.backends, fields(json!({"name": "A"})))
            .await
            .unwrap();
        h.backends.local.kv().set_simulate_write_error(true);
        assert!(run(&h.backends, &pending.id).await.is_ok());
        assert_eq!(h.fault_ops(), vec!["reject.mirror"]);
    }
}
