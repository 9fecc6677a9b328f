//! Pruning strategies for the memory population.
//!
//! Every strategy re-evaluates the full non-archived population on each
//! call. Pruning is advisory: per-record failures are logged and skipped,
//! and a failed candidate query yields a count of 0 instead of an error.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::error::Error;
use crate::record::MemoryRecord;
use crate::scoring::ScoringEngine;
use crate::store::{RecordFilter, RecordStore};

/// Strategy used to select records for eviction or archival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneStrategy {
    /// Hard-delete records below the importance threshold
    Importance,
    /// Hard-delete records older than the age cutoff
    Age,
    /// Hard-delete records accessed fewer times than the floor
    AccessFrequency,
    /// Hard-delete the lowest blended-score records over capacity
    Hybrid,
    /// Archive the lowest retention-score records over capacity
    AiOptimized,
}

impl std::fmt::Display for PruneStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Importance => write!(f, "importance"),
            Self::Age => write!(f, "age"),
            Self::AccessFrequency => write!(f, "access_frequency"),
            Self::Hybrid => write!(f, "hybrid"),
            Self::AiOptimized => write!(f, "ai_optimized"),
        }
    }
}

impl FromStr for PruneStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "importance" => Ok(Self::Importance),
            "age" => Ok(Self::Age),
            "access_frequency" => Ok(Self::AccessFrequency),
            "hybrid" => Ok(Self::Hybrid),
            "ai_optimized" => Ok(Self::AiOptimized),
            _ => Err(Error::Config(format!("Unknown pruning strategy: {}", s))),
        }
    }
}

/// Blended score used by hybrid pruning.
///
/// `importance * 0.5 + age_factor * 0.3 + access_factor * 0.2`, where the
/// age factor decays linearly over one year and the access factor saturates
/// at 10 accesses. Lowest-scoring records are pruned first.
pub fn hybrid_score(record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
    let age_factor = (1.0 - record.age_days(now) / 365.0).max(0.0);
    let access_factor = (record.access_count as f64 / 10.0).min(1.0);
    record.importance_score * 0.5 + age_factor * 0.3 + access_factor * 0.2
}

/// Selects and removes (or archives) records according to a strategy.
pub struct PruningEngine {
    store: Arc<dyn RecordStore>,
    scoring: Arc<ScoringEngine>,
}

impl PruningEngine {
    pub fn new(store: Arc<dyn RecordStore>, scoring: Arc<ScoringEngine>) -> Self {
        Self { store, scoring }
    }

    /// Hard-delete active records with importance below `threshold`.
    pub async fn prune_by_importance(&self, threshold: f64) -> usize {
        let filter = RecordFilter::active().importance_below(threshold);
        let Some(candidates) = self.candidates(&filter, "importance").await else {
            return 0;
        };
        self.delete_all(candidates).await
    }

    /// Hard-delete active records created more than `max_age_days` ago.
    pub async fn prune_by_age(&self, max_age_days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let filter = RecordFilter::active().created_before(cutoff);
        let Some(candidates) = self.candidates(&filter, "age").await else {
            return 0;
        };
        self.delete_all(candidates).await
    }

    /// Hard-delete active records accessed fewer than `min_accesses` times.
    pub async fn prune_by_access_frequency(&self, min_accesses: u64) -> usize {
        let filter = RecordFilter::active().access_count_below(min_accesses);
        let Some(candidates) = self.candidates(&filter, "access_frequency").await else {
            return 0;
        };
        self.delete_all(candidates).await
    }

    /// Hard-delete the lowest blended-score records until the active
    /// population is back at `max_memories`. No-op at or under capacity.
    pub async fn prune_hybrid(&self, max_memories: usize) -> usize {
        let Some(candidates) = self.candidates(&RecordFilter::active(), "hybrid").await else {
            return 0;
        };
        if candidates.len() <= max_memories {
            return 0;
        }

        let now = Utc::now();
        let excess = candidates.len() - max_memories;
        let mut scored: Vec<(MemoryRecord, f64)> = candidates
            .into_iter()
            .map(|record| {
                let score = hybrid_score(&record, now);
                (record, score)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let doomed = scored
            .into_iter()
            .take(excess)
            .map(|(record, _)| record)
            .collect();
        self.delete_all(doomed).await
    }

    /// Archive the lowest retention-score records until the active
    /// population is back at `max_memories`. Never deletes: archived
    /// records stay in the store with their retention score stamped.
    pub async fn prune_ai_optimized(&self, max_memories: usize) -> usize {
        let Some(candidates) = self.candidates(&RecordFilter::active(), "ai_optimized").await
        else {
            return 0;
        };
        if candidates.len() <= max_memories {
            return 0;
        }

        info!(
            total = candidates.len(),
            max_memories, "AI pruning: analyzing memories"
        );

        let scores = self.scoring.retention_scores(&candidates).await;
        let excess = candidates.len() - max_memories;
        let mut scored: Vec<(MemoryRecord, f64)> =
            candidates.into_iter().zip(scores).collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut archived = 0;
        for (mut record, score) in scored.into_iter().take(excess) {
            record.ai_retention_score = Some(score);
            record.archive("ai_retention");
            match self.store.upsert(&record).await {
                Ok(()) => archived += 1,
                Err(error) => {
                    warn!(id = %record.id, %error, "failed to archive memory, skipping")
                }
            }
        }

        info!(archived, "AI pruning archived memories");
        archived
    }

    /// Archive active records older than `max_age_days` whose importance is
    /// below `importance_threshold`.
    pub async fn archive_old(&self, max_age_days: i64, importance_threshold: f64) -> usize {
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let filter = RecordFilter::active()
            .created_before(cutoff)
            .importance_below(importance_threshold);
        let Some(candidates) = self.candidates(&filter, "archive_old").await else {
            return 0;
        };

        let mut archived = 0;
        for mut record in candidates {
            record.archive("age_and_low_importance");
            match self.store.upsert(&record).await {
                Ok(()) => archived += 1,
                Err(error) => {
                    warn!(id = %record.id, %error, "failed to archive memory, skipping")
                }
            }
        }

        if archived > 0 {
            info!(archived, "archived old low-value memories");
        }
        archived
    }

    /// Hard-delete archived records whose archival is older than
    /// `retention_days`.
    pub async fn purge_archived(&self, retention_days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let Some(candidates) = self
            .candidates(&RecordFilter::archived_only(), "purge_archived")
            .await
        else {
            return 0;
        };

        let expired = candidates
            .into_iter()
            .filter(|record| record.archived_at.is_some_and(|at| at < cutoff))
            .collect();
        self.delete_all(expired).await
    }

    async fn candidates(
        &self,
        filter: &RecordFilter,
        strategy: &str,
    ) -> Option<Vec<MemoryRecord>> {
        match self.store.query(filter).await {
            Ok(candidates) => Some(candidates),
            Err(err) => {
                error!(strategy, error = %err, "candidate query failed, pruning nothing");
                None
            }
        }
    }

    async fn delete_all(&self, records: Vec<MemoryRecord>) -> usize {
        let mut deleted = 0;
        for record in records {
            match self.store.delete(&record.id, &record.session_id).await {
                Ok(true) => deleted += 1,
                Ok(false) => warn!(id = %record.id, "memory already gone, skipping"),
                Err(error) => warn!(id = %record.id, %error, "failed to delete memory, skipping"),
            }
        }
        deleted
    }
}
