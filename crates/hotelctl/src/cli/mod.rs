//! # CLI Behavior
//!
//! This is **one possible client** for hotelstore, not the store itself. The
//! CLI is the only place that knows about stdout, exit codes and the
//! process environment.
//!
//! ## Storage Wiring
//!
//! - The local store is a directory of JSON files ([`hotelstore::FsKv`]).
//!   Its location is, in order: `--data-dir`, `data_dir` from config or
//!   `HOTELSTORE_DATA_DIR`, then the platform data directory.
//! - There is no network remote. `--demo-remote` attaches an in-process
//!   [`hotelstore::MemoryRemote`] that lives for one invocation, which is
//!   enough to exercise remote mode, mirroring and `migrate`.
//!
//! ## Module Structure
//!
//! - `setup`: argument parsing via clap
//! - `commands`: context setup and per-command handlers
//! - `render`: JSON output

mod commands;
mod render;
pub mod setup;

pub use commands::run;
