//! Scoring oracle abstraction.
//!
//! The oracle is an external LLM service asked to score memory batches for
//! retention or priority. It is allowed to be unavailable, slow, or return
//! garbage. Every failure surfaces as an `Err` that the scoring engine
//! converts into heuristic fallback, never into a caller-visible error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ltm_core::oracle::{OpenAiOracle, OracleConfig, RecordSnapshot, ScoringKind, ScoringOracle};
//!
//! let oracle = OpenAiOracle::new(
//!     OracleConfig::new("your-api-key").with_model("gpt-4o-mini"),
//! );
//!
//! let snapshots: Vec<RecordSnapshot> = records
//!     .iter()
//!     .map(|r| RecordSnapshot::from_record(r, ScoringKind::Retention))
//!     .collect();
//!
//! let scores = oracle.score(ScoringKind::Retention, &snapshots).await?;
//! ```

mod client;
mod types;

pub use client::{extract_scores, OpenAiOracle, OracleConfig};
pub use types::{RecordSnapshot, ScoringKind};

use async_trait::async_trait;

use crate::error::Result;

/// External service that scores memory records in batch.
///
/// Returns one float per input record, in input order. Callers treat any
/// `Err` as a signal to fall back to deterministic scoring.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn score(&self, kind: ScoringKind, records: &[RecordSnapshot]) -> Result<Vec<f64>>;
}
