//! # CLI Layer
//!
//! The CLI layer is the **only** place in the workspace that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Reads the process environment and platform directories
//! - Handles argument parsing
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: shell arguments into [`Cli`] via clap
//! 2. **Context Setup**: logging, configuration, local store location, the
//!    optional demo remote (which runs on an in-memory copy of the local
//!    data and leaves the disk alone)
//! 3. **Dispatch**: one handler per subcommand, each a single facade call
//! 4. **Output**: JSON through `render`

use super::render;
use super::setup::{parse_cli, Cli, Commands};
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use hotelstore::config::CONFIG_FILE;
use hotelstore::store::BACKUP_KEY;
use hotelstore::{
    Collection, Fields, FsKv, HotelStorage, KeyValueStore, Listing, ListingId, MemKv,
    MemoryRemote, RemoteStore, StorageConfig,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "hotelstore=info,hotelctl=info";

pub fn run() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(dispatch(cli))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("hotelstore=debug,hotelctl=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "hotelstore")
}

fn load_config(cli: &Cli) -> Result<StorageConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE)));
    debug!(config = ?path, "loading configuration");
    StorageConfig::load(path.as_deref()).context("failed to load configuration")
}

fn resolve_data_dir(cli: &Cli, config: &StorageConfig) -> PathBuf {
    cli.data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
        .unwrap_or_else(|| PathBuf::from(".hotelstore"))
}

/// Working copy of the on-disk keys for `--demo-remote` sessions. The demo
/// remote starts empty, so its results must never be mirrored to disk.
fn scratch_copy(disk: &FsKv) -> Result<MemKv> {
    let scratch = MemKv::new();
    for key in [
        Collection::Hotels.name(),
        Collection::PendingHotels.name(),
        BACKUP_KEY,
    ] {
        if let Some(value) = disk.get(key)? {
            scratch.set(key, &value)?;
        }
    }
    Ok(scratch)
}

fn parse_fields(raw: &str) -> Result<Fields> {
    let value: Value = serde_json::from_str(raw).context("listing must be valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("listing must be a JSON object, got {}", other),
    }
}

fn parse_id(raw: &str) -> ListingId {
    match raw.parse() {
        Ok(id) => id,
        Err(never) => match never {},
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let data_dir = resolve_data_dir(&cli, &config);
    debug!(data_dir = %data_dir.display(), "opening local store");
    let disk = FsKv::new(data_dir);

    if cli.demo_remote {
        let remote: Arc<dyn RemoteStore> = Arc::new(MemoryRemote::new());
        let storage = HotelStorage::new(scratch_copy(&disk)?, Some(remote), &config);
        execute(&storage, cli.command).await
    } else {
        execute(&HotelStorage::new(disk, None, &config), cli.command).await
    }
}

async fn execute<K: KeyValueStore + 'static>(
    storage: &HotelStorage<K>,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Add { json } => {
            let listing = storage.add_hotel(parse_fields(&json)?).await?;
            render::print(&render::listing(&listing), false);
        }
        Commands::Approve { id } => {
            let approved = storage.approve_hotel(&parse_id(&id)).await?;
            render::print(&render::approved(approved.as_ref()), false);
        }
        Commands::Reject { id } => {
            storage.reject_hotel(&parse_id(&id)).await?;
            render::print(&render::done("reject", &id), false);
        }
        Commands::List { pending } => {
            let listings = if pending {
                storage.get_pending_hotels().await
            } else {
                storage.get_approved_hotels().await
            };
            render::print(&render::listings(&listings), false);
        }
        Commands::Update { id, json } => {
            storage
                .update_hotel(&parse_id(&id), parse_fields(&json)?)
                .await?;
            render::print(&render::done("update", &id), false);
        }
        Commands::Delete { id } => {
            storage.delete_hotel(&parse_id(&id)).await?;
            render::print(&render::done("delete", &id), false);
        }
        Commands::Backup => {
            let snapshot = storage.create_backup().await?;
            render::print(&render::backup(&snapshot), false);
        }
        Commands::Restore => {
            let snapshot = storage.restore_from_backup().await?;
            render::print(&render::restored(snapshot.as_ref()), false);
        }
        Commands::Migrate => {
            let report = storage
                .migrate_to_remote()
                .await
                .context("migration needs a remote store (try --demo-remote)")?;
            render::print(&render::report(&report), false);
        }
        Commands::Watch { pending, ticks } => watch(storage, pending, ticks).await?,
    }
    Ok(())
}

async fn watch<K: KeyValueStore + 'static>(
    storage: &HotelStorage<K>,
    pending: bool,
    ticks: Option<usize>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let forward = move |listings: Vec<Listing>| {
        let _ = tx.send(listings);
    };
    if pending {
        storage.subscribe_to_pending_hotels(forward);
    } else {
        storage.subscribe_to_hotels(forward);
    }

    let mut delivered = 0usize;
    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(listings) = received else { break };
                render::print(&render::listings(&listings), true);
                delivered += 1;
                if ticks.is_some_and(|n| delivered >= n) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    storage.unsubscribe_all();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_must_be_an_object() {
        assert!(parse_fields(r#"{"name": "A"}"#).is_ok());
        assert!(parse_fields("[1, 2]").is_err());
        assert!(parse_fields("{oops").is_err());
    }

    #[test]
    fn ids_parse_as_local_or_remote() {
        assert_eq!(parse_id("1714557600000"), ListingId::Local(1_714_557_600_000));
        assert_eq!(parse_id("a1b2c3"), ListingId::Remote("a1b2c3".into()));
    }

    #[test]
    fn scratch_copy_carries_every_key_and_leaves_disk_alone() {
        let dir = tempfile::TempDir::new().unwrap();
        let disk = FsKv::new(dir.path());
        disk.set("pendingHotels", r#"[{"id":1,"name":"A"}]"#).unwrap();
        disk.set(BACKUP_KEY, "{}").unwrap();

        let scratch = scratch_copy(&disk).unwrap();
        scratch.set("pendingHotels", "[]").unwrap();

        assert_eq!(scratch.get(BACKUP_KEY).unwrap().as_deref(), Some("{}"));
        assert!(scratch.get("hotels").unwrap().is_none());
        assert_eq!(
            disk.get("pendingHotels").unwrap().as_deref(),
            Some(r#"[{"id":1,"name":"A"}]"#)
        );
    }

    #[test]
    fn explicit_data_dir_wins() {
        let cli = Cli {
            command: Commands::Backup,
            data_dir: Some(PathBuf::from("/srv/hotels")),
            config: None,
            demo_remote: false,
            verbose: false,
        };
        let config = StorageConfig {
            data_dir: Some(PathBuf::from("/etc/ignored")),
            ..StorageConfig::default()
        };
        assert_eq!(resolve_data_dir(&cli, &config), PathBuf::from("/srv/hotels"));
    }
}
