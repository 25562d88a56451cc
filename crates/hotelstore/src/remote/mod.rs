//! # Remote Document Store
//!
//! [`RemoteStore`] is the seam to a cloud document database holding three
//! collections (see [`Collection`]). The facade only needs a small surface:
//! insert with a generated id, get, partial update, delete, an equality
//! filtered query, and a live watch that re-delivers the full query result on
//! every change.
//!
//! Timestamps the remote must assign itself (creation, update, approval,
//! migration stamps) are requested through [`Write::server_timestamps`]
//! rather than written from the client clock.
//!
//! Used as `Arc<dyn RemoteStore>`.
//!
//! ## Implementations
//!
//! - [`memory::MemoryRemote`]: in-process document store with live watchers
//!   and failure injection.

use crate::error::Result;
use crate::model::Fields;
use crate::store::Collection;
use crate::subscriptions::SubscriptionHandle;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod memory;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// `field == value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: value.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.equals)
    }
}

/// Fields to write plus the names of fields the server stamps with its own
/// clock at commit time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Write {
    pub fields: Fields,
    pub server_timestamps: Vec<&'static str>,
}

impl Write {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
        }
    }

    pub fn stamp(mut self, field: &'static str) -> Self {
        self.fields.remove(field);
        self.server_timestamps.push(field);
        self
    }
}

/// Invoked with the full result set of a watched query.
pub type SnapshotCallback = Arc<dyn Fn(Vec<Document>) + Send + Sync>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether the client was initialised with usable configuration.
    fn is_configured(&self) -> bool;

    /// Inserts a document under a server-generated id and returns the id.
    async fn insert(&self, collection: Collection, write: Write) -> Result<String>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;

    /// Merges `write` into an existing document. Fails if it does not exist.
    async fn update(&self, collection: Collection, id: &str, write: Write) -> Result<()>;

    /// Deleting a missing document succeeds.
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    async fn query(&self, collection: Collection, filter: Option<&FieldFilter>)
        -> Result<Vec<Document>>;

    /// Opens a live query. `callback` receives the current result right away
    /// and again after every change, until the handle is cancelled.
    fn watch(
        &self,
        collection: Collection,
        filter: Option<FieldFilter>,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionHandle>;
}
