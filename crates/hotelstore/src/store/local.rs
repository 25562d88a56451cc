//! # Local Fallback Store
//!
//! Collections of listings persisted as whole JSON arrays in a
//! [`KeyValueStore`]. This is the sole backend when no remote store is
//! available, and a passive mirror of the remote results otherwise.
//!
//! Entries that do not parse as listings (no usable `id`, a foreign shape)
//! are left out of reads but written back untouched, so one bad record never
//! hides or destroys the rest of its collection.
//!
//! Every mutation is a read-modify-write of one complete array. Mutations of
//! one `LocalStore` are serialized through an internal lock, so they are
//! strictly ordered; separate processes sharing the same storage only get
//! the per-write atomicity of the underlying primitive.

use super::{Collection, KeyValueStore, BACKUP_KEY};
use crate::clock::Clock;
use crate::error::Result;
use crate::model::{field, BackupSnapshot, Fields, Listing, ListingId, ListingStatus};
use crate::subscriptions::SubscriptionHandle;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// One collection as read from storage.
struct Stored {
    listings: Vec<Listing>,
    unreadable: Vec<Value>,
}

pub struct LocalStore<K: KeyValueStore> {
    kv: K,
    clock: Arc<dyn Clock>,
    /// Last local id handed out. The lock also serializes mutations.
    last_issued: Mutex<i64>,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(kv: K, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            clock,
            last_issued: Mutex::new(0),
        }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    fn load(&self, collection: Collection) -> Result<Stored> {
        let entries: Vec<Value> = match self.kv.get(collection.name())? {
            None => Vec::new(),
            Some(raw) => serde_json::from_str(&raw)?,
        };

        let mut stored = Stored {
            listings: Vec::with_capacity(entries.len()),
            unreadable: Vec::new(),
        };
        for entry in entries {
            match Listing::deserialize(&entry) {
                Ok(listing) => stored.listings.push(listing),
                Err(e) => {
                    warn!(%collection, error = %e, "skipping unreadable local record");
                    stored.unreadable.push(entry);
                }
            }
        }
        Ok(stored)
    }

    fn save(&self, collection: Collection, stored: &Stored) -> Result<()> {
        let mut entries = Vec::with_capacity(stored.listings.len() + stored.unreadable.len());
        for listing in &stored.listings {
            entries.push(serde_json::to_value(listing)?);
        }
        entries.extend_from_slice(&stored.unreadable);
        let raw = serde_json::to_string(&entries)?;
        self.kv.set(collection.name(), &raw)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, i64> {
        self.last_issued.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the readable listings of the collection, or none when the key
    /// is unset or not a JSON array. Never fails.
    pub fn get_all(&self, collection: Collection) -> Vec<Listing> {
        match self.load(collection) {
            Ok(stored) => stored.listings,
            Err(e) => {
                warn!(%collection, error = %e, "local collection unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Appends `record` to the collection and persists the full array.
    ///
    /// The id is, in order of preference: `id`, an `id` already present in
    /// `record`, or a fresh millisecond id. An existing entry with the same id
    /// is replaced rather than duplicated.
    pub fn append(
        &self,
        collection: Collection,
        record: Fields,
        id: Option<ListingId>,
    ) -> Result<Listing> {
        let mut last_issued = self.lock();
        let mut stored = self.load(collection)?;

        let id = match id.or_else(|| embedded_id(&record)) {
            Some(id) => id,
            None => ListingId::Local(self.issue_id(&mut last_issued)),
        };

        let mut object = record;
        object.insert(field::ID.to_string(), serde_json::to_value(&id)?);
        let listing: Listing = serde_json::from_value(Value::Object(object))?;

        match stored.listings.iter_mut().find(|l| l.id == listing.id) {
            Some(existing) => *existing = listing.clone(),
            None => stored.listings.push(listing.clone()),
        }
        self.save(collection, &stored)?;
        debug!(%collection, id = %listing.id, "local append");
        Ok(listing)
    }

    /// Clock-based id, bumped until it collides with nothing issued or stored.
    fn issue_id(&self, last_issued: &mut i64) -> i64 {
        let mut taken: Vec<ListingId> = Vec::new();
        for collection in [Collection::Hotels, Collection::PendingHotels] {
            taken.extend(self.get_all(collection).into_iter().map(|l| l.id));
        }

        let mut candidate = self.clock.now().timestamp_millis();
        if candidate <= *last_issued {
            candidate = *last_issued + 1;
        }
        while taken.contains(&ListingId::Local(candidate)) {
            candidate += 1;
        }
        *last_issued = candidate;
        candidate
    }

    /// Merges `patch` over the matching record. Unknown ids are a silent
    /// no-op.
    pub fn update(&self, collection: Collection, id: &ListingId, patch: &Fields) -> Result<()> {
        let _guard = self.lock();
        let mut stored = self.load(collection)?;
        let Some(position) = stored.listings.iter().position(|l| &l.id == id) else {
            return Ok(());
        };
        stored.listings[position] = stored.listings[position].merged(patch)?;
        self.save(collection, &stored)
    }

    /// Drops the matching record. Unknown ids are a silent no-op.
    pub fn remove(&self, collection: Collection, id: &ListingId) -> Result<()> {
        let _guard = self.lock();
        let mut stored = self.load(collection)?;
        let before = stored.listings.len();
        stored.listings.retain(|l| &l.id != id);
        if stored.listings.len() == before {
            return Ok(());
        }
        self.save(collection, &stored)
    }

    /// Moves a pending record into the approved collection, keeping its id.
    /// Returns `None` when `id` is not pending.
    pub fn move_approve(&self, id: &ListingId) -> Result<Option<Listing>> {
        let _guard = self.lock();
        let mut pending = self.load(Collection::PendingHotels)?;
        let Some(position) = pending.listings.iter().position(|l| &l.id == id) else {
            return Ok(None);
        };

        let now = self.clock.now();
        let mut listing = pending.listings[position].clone();
        listing.set_status(ListingStatus::Approved);
        listing.set_approved_at(now);
        listing.set_updated_at(now);

        // Destination first: a failure in between leaves a duplicate, not a loss.
        let mut approved = self.load(Collection::Hotels)?;
        approved.listings.retain(|l| l.id != listing.id);
        approved.listings.push(listing.clone());
        self.save(Collection::Hotels, &approved)?;

        pending.listings.remove(position);
        self.save(Collection::PendingHotels, &pending)?;

        debug!(id = %listing.id, "local approve");
        Ok(Some(listing))
    }

    /// Overwrites the whole collection, unreadable entries included.
    pub fn replace_all(&self, collection: Collection, listings: &[Listing]) -> Result<()> {
        let _guard = self.lock();
        let stored = Stored {
            listings: listings.to_vec(),
            unreadable: Vec::new(),
        };
        self.save(collection, &stored)
    }

    pub fn read_backup(&self) -> Result<Option<BackupSnapshot>> {
        match self.kv.get(BACKUP_KEY)? {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        }
    }

    pub fn write_backup(&self, snapshot: &BackupSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.kv.set(BACKUP_KEY, &raw)
    }
}

impl<K: KeyValueStore + 'static> LocalStore<K> {
    /// Delivers the collection to `callback` right away and then every
    /// `interval` until the returned handle is cancelled.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn poll<F>(
        self: &Arc<Self>,
        collection: Collection,
        interval: Duration,
        callback: F,
    ) -> SubscriptionHandle
    where
        F: Fn(Vec<Listing>) + Send + Sync + 'static,
    {
        let store = Arc::clone(self);
        let period = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback(store.get_all(collection));
            }
        });
        debug!(%collection, ?period, "local poll started");
        SubscriptionHandle::from_task(task)
    }
}

fn embedded_id(record: &Fields) -> Option<ListingId> {
    record
        .get(field::ID)
        .and_then(|raw| serde_json::from_value(raw.clone()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::mem_kv::MemKv;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const T0: i64 = 1_714_557_600_000;

    fn make_store() -> (LocalStore<MemKv>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.timestamp_millis_opt(T0).single().unwrap(),
        ));
        (LocalStore::new(MemKv::new(), clock.clone()), clock)
    }

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn get_all_on_unset_collection_is_empty() {
        let (store, _) = make_store();
        assert!(store.get_all(Collection::Hotels).is_empty());
    }

    #[test]
    fn get_all_on_corrupt_value_is_empty() {
        let (store, _) = make_store();
        store.kv().set_raw("hotels", "{not json");
        assert!(store.get_all(Collection::Hotels).is_empty());
    }

    #[test]
    fn unreadable_entries_are_skipped_and_kept() {
        let (store, _) = make_store();
        store.kv().set_raw(
            "pendingHotels",
            r#"[{"id": 1714557600000, "name": "Good"}, {"name": "legacy, no id"}, {"id": null}]"#,
        );

        let all = store.get_all(Collection::PendingHotels);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].field("name"), Some(&json!("Good")));

        let added = store
            .append(Collection::PendingHotels, fields(json!({"name": "New"})), None)
            .unwrap();
        assert_eq!(added.id, ListingId::Local(T0 + 1));
        assert_eq!(store.get_all(Collection::PendingHotels).len(), 2);

        let raw = store.kv().get("pendingHotels").unwrap().unwrap();
        let entries: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries.contains(&json!({"name": "legacy, no id"})));
        assert!(entries.contains(&json!({"id": null})));
    }

    #[test]
    fn corrupt_collection_does_not_block_appends_elsewhere() {
        let (store, _) = make_store();
        store.kv().set_raw("hotels", "{not json");

        let listing = store
            .append(Collection::PendingHotels, fields(json!({"name": "A"})), None)
            .unwrap();

        assert_eq!(listing.id, ListingId::Local(T0));
        assert_eq!(store.get_all(Collection::PendingHotels), vec![listing]);
        assert!(store.get_all(Collection::Hotels).is_empty());
    }

    #[test]
    fn append_assigns_clock_based_id() {
        let (store, _) = make_store();
        let listing = store
            .append(Collection::PendingHotels, fields(json!({"name": "A"})), None)
            .unwrap();
        assert_eq!(listing.id, ListingId::Local(T0));
        assert_eq!(store.get_all(Collection::PendingHotels), vec![listing]);
    }

    #[test]
    fn append_in_same_millisecond_gets_distinct_ids() {
        let (store, _) = make_store();
        let a = store
            .append(Collection::PendingHotels, fields(json!({"name": "A"})), None)
            .unwrap();
        let b = store
            .append(Collection::PendingHotels, fields(json!({"name": "B"})), None)
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(b.id, ListingId::Local(T0 + 1));
    }

    #[test]
    fn fresh_ids_skip_ids_already_stored_in_other_collection() {
        let (store, _) = make_store();
        store
            .append(
                Collection::Hotels,
                fields(json!({"name": "Old"})),
                Some(ListingId::Local(T0)),
            )
            .unwrap();
        let fresh = LocalStore::new(store.kv, store.clock.clone());
        let listing = fresh
            .append(Collection::PendingHotels, fields(json!({"name": "New"})), None)
            .unwrap();
        assert_eq!(listing.id, ListingId::Local(T0 + 1));
    }

    #[test]
    fn append_uses_provided_or_embedded_id() {
        let (store, _) = make_store();
        let provided = store
            .append(
                Collection::Hotels,
                fields(json!({"name": "A"})),
                Some(ListingId::Remote("r-1".into())),
            )
            .unwrap();
        let embedded = store
            .append(Collection::Hotels, fields(json!({"id": "r-2", "name": "B"})), None)
            .unwrap();
        assert_eq!(provided.id, ListingId::Remote("r-1".into()));
        assert_eq!(embedded.id, ListingId::Remote("r-2".into()));
    }

    #[test]
    fn append_with_existing_id_replaces_entry() {
        let (store, _) = make_store();
        let id = Some(ListingId::Remote("r-1".into()));
        store
            .append(Collection::Hotels, fields(json!({"name": "A"})), id.clone())
            .unwrap();
        store
            .append(Collection::Hotels, fields(json!({"name": "A2"})), id)
            .unwrap();

        let all = store.get_all(Collection::Hotels);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].field("name"), Some(&json!("A2")));
    }

    #[test]
    fn update_merges_and_ignores_unknown_ids() {
        let (store, _) = make_store();
        let listing = store
            .append(Collection::Hotels, fields(json!({"name": "A", "rate": 80})), None)
            .unwrap();

        store
            .update(Collection::Hotels, &listing.id, &fields(json!({"rate": 95})))
            .unwrap();
        store
            .update(Collection::Hotels, &ListingId::Local(1), &fields(json!({"rate": 1})))
            .unwrap();

        let all = store.get_all(Collection::Hotels);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].field("rate"), Some(&json!(95)));
        assert_eq!(all[0].field("name"), Some(&json!("A")));
    }

    #[test]
    fn remove_filters_and_ignores_unknown_ids() {
        let (store, _) = make_store();
        let a = store
            .append(Collection::Hotels, fields(json!({"name": "A"})), None)
            .unwrap();
        store
            .append(Collection::Hotels, fields(json!({"name": "B"})), None)
            .unwrap();

        store.remove(Collection::Hotels, &ListingId::Local(1)).unwrap();
        assert_eq!(store.get_all(Collection::Hotels).len(), 2);

        store.remove(Collection::Hotels, &a.id).unwrap();
        let all = store.get_all(Collection::Hotels);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].field("name"), Some(&json!("B")));
    }

    #[test]
    fn move_approve_keeps_id_and_leaves_pending() {
        let (store, clock) = make_store();
        let pending = store
            .append(
                Collection::PendingHotels,
                fields(json!({"name": "A", "status": "pending"})),
                None,
            )
            .unwrap();
        clock.advance(chrono::Duration::seconds(30));

        let moved = store.move_approve(&pending.id).unwrap().unwrap();
        assert_eq!(moved.id, pending.id);
        assert!(moved.is_approved());
        assert_eq!(moved.approved_at, Some(clock.now()));

        assert!(store.get_all(Collection::PendingHotels).is_empty());
        assert_eq!(store.get_all(Collection::Hotels), vec![moved]);
    }

    #[test]
    fn move_approve_of_unknown_id_is_none() {
        let (store, _) = make_store();
        assert!(store.move_approve(&ListingId::Local(9)).unwrap().is_none());
        assert!(store.get_all(Collection::Hotels).is_empty());
    }

    #[test]
    fn write_failure_propagates_and_keeps_previous_array() {
        let (store, _) = make_store();
        store
            .append(Collection::Hotels, fields(json!({"name": "A"})), None)
            .unwrap();
        store.kv().set_simulate_write_error(true);

        let result = store.append(Collection::Hotels, fields(json!({"name": "B"})), None);
        assert!(result.is_err());
        assert_eq!(store.get_all(Collection::Hotels).len(), 1);
    }

    #[test]
    fn backup_slot_is_single_and_overwritten() {
        let (store, clock) = make_store();
        assert!(store.read_backup().unwrap().is_none());

        let first = BackupSnapshot {
            hotels: vec![],
            pending_hotels: vec![],
            timestamp: clock.now(),
            version: "1.0".into(),
        };
        store.write_backup(&first).unwrap();
        let second = BackupSnapshot {
            timestamp: clock.now() + chrono::Duration::hours(1),
            ..first.clone()
        };
        store.write_backup(&second).unwrap();

        assert_eq!(store.read_backup().unwrap(), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_delivers_immediately_then_on_interval_until_cancelled() {
        let (store, _) = make_store();
        let store = Arc::new(store);
        let seen: Arc<Mutex<Vec<usize>>> = Arc::default();

        let sink = seen.clone();
        let handle = store.poll(Collection::Hotels, Duration::from_secs(5), move |all| {
            sink.lock().unwrap().push(all.len());
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*seen.lock().unwrap(), vec![0]);

        store
            .append(Collection::Hotels, fields(json!({"name": "A"})), None)
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
