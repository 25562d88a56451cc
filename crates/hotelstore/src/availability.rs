//! One-shot decision between remote and local mode.
//!
//! The decision is taken once when the facade is built and cached for the
//! facade's lifetime. A remote store that comes back later is not picked up,
//! and one that disappears is handled by the per-operation fallbacks instead.

use crate::remote::RemoteStore;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Remote,
    Local,
}

impl Availability {
    pub fn detect(remote: Option<&dyn RemoteStore>, force_local: bool) -> Self {
        let mode = match remote {
            _ if force_local => Availability::Local,
            Some(remote) if remote.is_configured() => Availability::Remote,
            _ => Availability::Local,
        };
        match mode {
            Availability::Remote => info!("remote document store available, using remote mode"),
            Availability::Local if force_local => {
                info!("local mode forced by configuration, remote store ignored")
            }
            Availability::Local => info!("remote document store unavailable, using local storage"),
        }
        mode
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Availability::Remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryRemote;

    #[test]
    fn no_handle_means_local() {
        assert_eq!(Availability::detect(None, false), Availability::Local);
    }

    #[test]
    fn configured_handle_means_remote() {
        let remote = MemoryRemote::new();
        assert_eq!(Availability::detect(Some(&remote), false), Availability::Remote);
    }

    #[test]
    fn unconfigured_handle_means_local() {
        let remote = MemoryRemote::unconfigured();
        assert_eq!(Availability::detect(Some(&remote), false), Availability::Local);
    }

    #[test]
    fn force_local_wins() {
        let remote = MemoryRemote::new();
        assert_eq!(Availability::detect(Some(&remote), true), Availability::Local);
    }
}
