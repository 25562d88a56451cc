//! # hotelctl
//!
//! Operator CLI over the `hotelstore` library. The binary is intentionally
//! thin: everything lives in `src/cli/`, and this file only invokes
//! `cli::run()` and handles process termination.
//!
//! ## Layering
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/hotelctl/src/cli/)                    │
//! │  - clap argument parsing (setup.rs)                      │
//! │  - storage wiring + dispatch (commands.rs)               │
//! │  - JSON rendering (render.rs)                            │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  API Layer (crates/hotelstore/src/api.rs)                │
//! │  - HotelStorage facade, dispatch only                    │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Command Layer (crates/hotelstore/src/commands/*)        │
//! │  - remote-first, local-fallback rules                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Output on stdout is always JSON, so the tool composes with `jq`. Logs go to
//! stderr and are controlled with `RUST_LOG` or `--verbose`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
