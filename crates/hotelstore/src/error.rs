use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A single remote document-store call failed.
    #[error("Remote store error: {0}")]
    Remote(String),

    /// The facade runs in local mode, so an operation that only makes sense
    /// against the remote store cannot run.
    #[error("Remote store is not available")]
    RemoteUnavailable,

    /// The local key/value storage rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A failure the store recovered from on its own.
///
/// Callers never see these as errors; they are reported to an optional
/// [`ErrorHook`] (and logged) so operators can still observe them.
#[derive(Debug)]
pub struct StorageFault<'a> {
    /// Operation name, e.g. `"approve"` or `"list.approved.mirror"`.
    pub operation: &'static str,
    pub error: &'a StoreError,
}

pub type ErrorHook = std::sync::Arc<dyn Fn(&StorageFault<'_>) + Send + Sync>;
