//! Session-partitioned record persistence.
//!
//! The engines talk to storage exclusively through the [`RecordStore`]
//! trait, so the backing database is injected at construction time and test
//! code can swap in [`InMemoryStore`]. Two backends ship with the crate:
//!
//! - [`InMemoryStore`]: process-local, for tests and short-lived agents
//! - [`SqliteStore`]: embedded persistent storage with a versioned schema
//!
//! ## Example
//!
//! ```rust,ignore
//! use ltm_core::store::{InMemoryStore, RecordFilter, RecordStore};
//! use ltm_core::record::{MemoryRecord, MemoryType};
//!
//! let store = InMemoryStore::new();
//! let record = MemoryRecord::new("session-1", "hello", MemoryType::Conversation, 0.5, vec![]);
//! store.upsert(&record).await?;
//!
//! let active = store.query(&RecordFilter::active().in_session("session-1")).await?;
//! ```

mod filter;
mod memory;
mod schema;
mod sqlite;

pub use filter::RecordFilter;
pub use memory::InMemoryStore;
pub use schema::{get_schema_version, initialize_schema, is_initialized, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{MemoryRecord, RecordId};

/// Keyed, session-partitioned record persistence.
///
/// The physical key is `(session_id, id)`. Implementations may evaluate
/// [`RecordFilter`] natively or scan and post-filter; callers only rely on
/// the returned set, not its order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return all records matching the filter.
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MemoryRecord>>;

    /// Point read by `(id, session_id)`.
    async fn get(&self, id: &RecordId, session_id: &str) -> Result<Option<MemoryRecord>>;

    /// Insert or replace a record under its `(session_id, id)` key.
    async fn upsert(&self, record: &MemoryRecord) -> Result<()>;

    /// Point delete. Returns whether a record was removed.
    async fn delete(&self, id: &RecordId, session_id: &str) -> Result<bool>;

    /// Count records matching the filter.
    async fn count(&self, filter: &RecordFilter) -> Result<usize> {
        Ok(self.query(filter).await?.len())
    }
}
