//! Priority reordering of session memories.
//!
//! Reordering never deletes anything: it recomputes `priority_score` for
//! every non-archived record in scope and stamps `last_reordered`. The
//! heuristic path is idempotent for a fixed clock; the AI path may vary
//! between calls since the oracle is free to change its mind.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::record::MemoryRecord;
use crate::scoring::{priority_heuristic, PriorityWeights, ScoringEngine};
use crate::store::{RecordFilter, RecordStore};

/// Strategy selecting the weight preset for a reorder pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderStrategy {
    /// Rank chiefly by caller-assigned importance
    Importance,
    /// Rank chiefly by creation recency
    Recency,
    /// Rank chiefly by access frequency
    AccessFrequency,
}

impl ReorderStrategy {
    /// Weight preset applied by this strategy.
    pub fn weights(self) -> PriorityWeights {
        match self {
            Self::Importance => PriorityWeights::IMPORTANCE,
            Self::Recency => PriorityWeights::RECENCY,
            Self::AccessFrequency => PriorityWeights::ACCESS,
        }
    }
}

impl std::fmt::Display for ReorderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Importance => write!(f, "importance"),
            Self::Recency => write!(f, "recency"),
            Self::AccessFrequency => write!(f, "access_frequency"),
        }
    }
}

impl FromStr for ReorderStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "importance" => Ok(Self::Importance),
            "recency" => Ok(Self::Recency),
            "access_frequency" => Ok(Self::AccessFrequency),
            _ => Err(Error::Config(format!("Unknown reordering strategy: {}", s))),
        }
    }
}

/// Recomputes priority scores and writes them back to the store.
pub struct ReorderingEngine {
    store: Arc<dyn RecordStore>,
    scoring: Arc<ScoringEngine>,
}

impl ReorderingEngine {
    pub fn new(store: Arc<dyn RecordStore>, scoring: Arc<ScoringEngine>) -> Self {
        Self { store, scoring }
    }

    /// Recompute priority scores for one session using the strategy's
    /// heuristic preset. Returns the count of records updated.
    pub async fn reorder(&self, session_id: &str, strategy: ReorderStrategy) -> usize {
        let filter = RecordFilter::active().in_session(session_id);
        let records = match self.store.query(&filter).await {
            Ok(records) => records,
            Err(err) => {
                error!(session_id, error = %err, "reorder query failed, reordering nothing");
                return 0;
            }
        };
        if records.is_empty() {
            return 0;
        }

        let now = Utc::now();
        let weights = strategy.weights();
        let updated = self
            .write_back(records, |record| priority_heuristic(record, now, &weights))
            .await;

        info!(updated, session_id, strategy = %strategy, "reordered session memories");
        updated
    }

    /// Recompute priority scores for an explicit batch spanning any number
    /// of sessions, preferring the oracle and falling back to the balanced
    /// heuristic. Returns the count of records updated.
    pub async fn reorder_intelligent(&self, records: Vec<MemoryRecord>) -> usize {
        if records.is_empty() {
            return 0;
        }

        let scores = self.scoring.priority_scores(&records).await;
        let mut indexed = scores.into_iter();
        let updated = self
            .write_back(records, |_| {
                indexed.next().unwrap_or(0.0)
            })
            .await;

        info!(updated, "reordered memories intelligently");
        updated
    }

    async fn write_back<F>(&self, records: Vec<MemoryRecord>, mut score: F) -> usize
    where
        F: FnMut(&MemoryRecord) -> f64,
    {
        let now = Utc::now();
        let mut updated = 0;
        for mut record in records {
            record.priority_score = Some(score(&record));
            record.last_reordered = Some(now);
            match self.store.upsert(&record).await {
                Ok(()) => updated += 1,
                Err(error) => {
                    warn!(id = %record.id, %error, "failed to persist priority, skipping")
                }
            }
        }
        updated
    }
}
