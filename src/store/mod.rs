//! Keyed record storage.
//!
//! [`Repository`] is the async trait the grading service is written against.
//! [`MemoryStore`] keeps records in a map for tests and one-off runs;
//! [`JsonFileStore`] persists each record type as a JSON array on disk.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::grading::types::{Assignment, Submission};

/// A record that can be stored under a string key.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable record kind, used in log fields and error messages.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

impl Record for Submission {
    const KIND: &'static str = "submission";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Assignment {
    const KIND: &'static str = "assignment";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Predicate passed to [`Repository::list`].
pub type Filter<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// Durable keyed storage for one record type.
#[async_trait::async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// Returns the record stored under `id`, if any.
    async fn get(&self, id: &str) -> Result<Option<T>>;

    /// Returns every record matching `filter`.
    async fn list(&self, filter: Filter<'_, T>) -> Result<Vec<T>>;

    /// Inserts `record`, replacing any record with the same id.
    async fn put(&self, record: T) -> Result<()>;

    /// Inserts `record` only if its id is free. Returns `false`, leaving the
    /// store untouched, when a record with that id already exists. The check
    /// and the write happen under one lock.
    async fn insert(&self, record: T) -> Result<bool>;
}

/// Matches every record.
pub fn all<T>(_: &T) -> bool {
    true
}
