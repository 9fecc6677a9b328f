//! # ltm-core
//!
//! Bounded long-term memory for AI agents with importance-based pruning,
//! reordering, and archival.
//!
//! ## Core Components
//!
//! - **Record**: the stored unit of agent experience, partitioned by session
//! - **Store**: persistence behind the [`RecordStore`] trait (in-memory and SQLite)
//! - **Scoring**: heuristic and oracle-delegated retention/priority scores
//! - **Pruning / Reordering**: capacity enforcement and priority ordering
//! - **Manager**: the [`LongTermMemory`] façade the agent runtime talks to
//! - **Session**: short-term sliding-window memory for the live conversation
//!
//! ## Example
//!
//! ```rust,ignore
//! use ltm_core::{InMemoryStore, LongTermMemory, MemoryConfig, MemoryType, SearchRequest};
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let memory = LongTermMemory::new(store, MemoryConfig::default());
//!
//! memory
//!     .add_memory("session-1", "User prefers aisle seats", MemoryType::Knowledge, 0.8, vec![])
//!     .await?;
//!
//! let hits = memory
//!     .search_memories(&SearchRequest::new("session-1").with_query("aisle"))
//!     .await?;
//! ```

pub mod error;
pub mod manager;
pub mod oracle;
pub mod pruning;
pub mod record;
pub mod reordering;
pub mod scoring;
pub mod session;
pub mod store;

#[cfg(test)]
mod proptest;

// Re-exports for convenience
pub use error::{Error, Result};
pub use manager::{
    LongTermMemory, MemoryConfig, MemoryStatistics, OptimizationReport, PerformanceMetrics,
    SearchRequest,
};
pub use oracle::{
    extract_scores, OpenAiOracle, OracleConfig, RecordSnapshot, ScoringKind, ScoringOracle,
};
pub use pruning::{hybrid_score, PruneStrategy, PruningEngine};
pub use record::{MemoryRecord, MemoryType, RecordId};
pub use reordering::{ReorderStrategy, ReorderingEngine};
pub use scoring::{priority_heuristic, retention_heuristic, PriorityWeights, ScoringEngine};
pub use session::{Role, ShortTermItem, ShortTermMemory, WindowSummary};
pub use store::{InMemoryStore, RecordFilter, RecordStore, SqliteStore};
