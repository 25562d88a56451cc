use super::{Document, FieldFilter, RemoteStore, SnapshotCallback, Write};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::model::Fields;
use crate::store::Collection;
use crate::subscriptions::SubscriptionHandle;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

struct Watcher {
    collection: Collection,
    filter: Option<FieldFilter>,
    callback: SnapshotCallback,
}

type Collections = HashMap<Collection, BTreeMap<String, Fields>>;

/// In-process document store.
///
/// Documents live in per-collection maps ordered by id. Watchers are notified
/// synchronously after every committed write, outside of any lock.
///
/// Failure injection (`set_offline`, `fail_next_inserts`, ...) lets tests
/// exercise the facade's fallback paths.
pub struct MemoryRemote {
    configured: bool,
    clock: Arc<dyn Clock>,
    collections: Mutex<Collections>,
    watchers: Arc<Mutex<HashMap<u64, Watcher>>>,
    next_watcher: AtomicU64,
    offline: AtomicBool,
    watch_unavailable: AtomicBool,
    failing_inserts: AtomicUsize,
    failing_deletes: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            configured: true,
            clock,
            collections: Mutex::new(HashMap::new()),
            watchers: Arc::new(Mutex::new(HashMap::new())),
            next_watcher: AtomicU64::new(1),
            offline: AtomicBool::new(false),
            watch_unavailable: AtomicBool::new(false),
            failing_inserts: AtomicUsize::new(0),
            failing_deletes: AtomicUsize::new(0),
        }
    }

    /// A client whose initialisation failed: present, but not usable.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::default()
        }
    }

    /// Every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes opening live queries fail.
    pub fn set_watch_unavailable(&self, unavailable: bool) {
        self.watch_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_next_inserts(&self, count: usize) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_deletes(&self, count: usize) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }

    /// Number of documents in a collection, for assertions.
    pub fn len(&self, collection: Collection) -> usize {
        self.lock_collections()
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    /// Writes a document with a chosen id, bypassing failure injection.
    pub fn seed(&self, collection: Collection, id: &str, fields: Fields) {
        self.lock_collections()
            .entry(collection)
            .or_default()
            .insert(id.to_string(), fields);
        self.notify(collection);
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_collections(&self) -> std::sync::MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(&self, op: &str) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Remote(format!("{}: backend unreachable", op)));
        }
        Ok(())
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn resolve(&self, write: Write) -> Result<Fields> {
        let mut fields = write.fields;
        if !write.server_timestamps.is_empty() {
            let now = serde_json::to_value(self.clock.now())?;
            for field in write.server_timestamps {
                fields.insert(field.to_string(), now.clone());
            }
        }
        Ok(fields)
    }

    fn snapshot(&self, collection: Collection, filter: Option<&FieldFilter>) -> Vec<Document> {
        self.lock_collections()
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| filter.map_or(true, |f| f.matches(fields)))
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&self, collection: Collection) {
        let targets: Vec<(Option<FieldFilter>, SnapshotCallback)> = self
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|w| w.collection == collection)
            .map(|w| (w.filter.clone(), Arc::clone(&w.callback)))
            .collect();

        for (filter, callback) in targets {
            callback(self.snapshot(collection, filter.as_ref()));
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn insert(&self, collection: Collection, write: Write) -> Result<String> {
        self.check_online("insert")?;
        if Self::take_failure(&self.failing_inserts) {
            return Err(StoreError::Remote("insert: injected failure".to_string()));
        }
        let fields = self.resolve(write)?;
        let id = Uuid::new_v4().simple().to_string();
        self.lock_collections()
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        debug!(%collection, %id, "remote insert");
        self.notify(collection);
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        self.check_online("get")?;
        Ok(self
            .lock_collections()
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn update(&self, collection: Collection, id: &str, write: Write) -> Result<()> {
        self.check_online("update")?;
        let patch = self.resolve(write)?;
        {
            let mut collections = self.lock_collections();
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| {
                    StoreError::Remote(format!("update: no document {}/{}", collection, id))
                })?;
            for (key, value) in patch {
                doc.insert(key, value);
            }
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.check_online("delete")?;
        if Self::take_failure(&self.failing_deletes) {
            return Err(StoreError::Remote("delete: injected failure".to_string()));
        }
        let removed = self
            .lock_collections()
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>> {
        self.check_online("query")?;
        Ok(self.snapshot(collection, filter))
    }

    fn watch(
        &self,
        collection: Collection,
        filter: Option<FieldFilter>,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionHandle> {
        self.check_online("watch")?;
        if self.watch_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("watch: live queries unavailable".to_string()));
        }

        let key = self.next_watcher.fetch_add(1, Ordering::Relaxed);
        callback(self.snapshot(collection, filter.as_ref()));
        self.watchers.lock().unwrap_or_else(|e| e.into_inner()).insert(
            key,
            Watcher {
                collection,
                filter,
                callback,
            },
        );

        let watchers = Arc::clone(&self.watchers);
        Ok(SubscriptionHandle::new(move || {
            watchers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&key);
        }))
    }
}
