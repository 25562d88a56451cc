use crate::api::HotelStorage;
use crate::clock::ManualClock;
use crate::config::StorageConfig;
use crate::model::Fields;
use crate::remote::memory::MemoryRemote;
use crate::remote::RemoteStore;
use crate::store::mem_kv::MemKv;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

/// Installs a compact `tracing` subscriber once per test binary. Honours
/// `RUST_LOG`, silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .compact()
            .try_init();
    });
}

/// Turns a `json!({...})` literal into listing fields.
pub fn fields(value: serde_json::Value) -> Fields {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// A facade over in-memory backends with a controllable clock, plus a log of
/// every fault it recovered from.
pub struct TestEnv {
    pub storage: HotelStorage<Arc<MemKv>>,
    pub kv: Arc<MemKv>,
    pub remote: Arc<MemoryRemote>,
    pub clock: Arc<ManualClock>,
    pub faults: Arc<Mutex<Vec<String>>>,
}

impl TestEnv {
    /// Remote mode over a fresh `MemoryRemote`.
    pub fn remote() -> Self {
        Self::build(true, StorageConfig::default())
    }

    /// Local mode: no remote handle is passed to the facade at all.
    pub fn local() -> Self {
        Self::build(false, StorageConfig::default())
    }

    pub fn with_config(remote_mode: bool, config: StorageConfig) -> Self {
        Self::build(remote_mode, config)
    }

    fn build(remote_mode: bool, config: StorageConfig) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
                .single()
                .unwrap_or_default(),
        ));
        let kv = Arc::new(MemKv::new());
        let remote = Arc::new(MemoryRemote::with_clock(clock.clone()));
        let handle: Option<Arc<dyn RemoteStore>> = if remote_mode {
            Some(remote.clone())
        } else {
            None
        };

        let faults: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = faults.clone();
        let storage = HotelStorage::with_clock(kv.clone(), handle, &config, clock.clone())
            .with_error_hook(move |fault| {
                sink.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(fault.operation.to_string());
            });

        Self {
            storage,
            kv,
            remote,
            clock,
            faults,
        }
    }

    pub fn tick(&self) {
        self.clock.advance(chrono::Duration::seconds(1));
    }

    pub fn fault_ops(&self) -> Vec<String> {
        self.faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
