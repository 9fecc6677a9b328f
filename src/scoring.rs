//! Retention and priority scoring.
//!
//! Two score families drive the engines: *retention* scores decide what the
//! pruning engine keeps, *priority* scores decide the ordering the reordering
//! engine writes back. Both have deterministic heuristic formulas; when AI
//! scoring is enabled and an oracle is wired in, batches are scored by the
//! oracle instead, with silent fallback to the heuristics on any failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::oracle::{RecordSnapshot, ScoringKind, ScoringOracle};
use crate::record::{clamp_unit, MemoryRecord, MemoryType};

/// Days over which the retention recency factor decays to zero.
const RETENTION_RECENCY_DAYS: f64 = 30.0;
/// Days over which the priority recency factor decays to zero.
const PRIORITY_RECENCY_DAYS: f64 = 90.0;
/// Access count at which the priority access factor saturates.
const ACCESS_SATURATION: f64 = 10.0;

/// Weight preset for the priority formula.
///
/// The blend is a tunable constant, not an inferred behavior: each preset
/// documents exactly how importance, creation recency (90-day horizon), and
/// access frequency (saturating at 10 accesses) are combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityWeights {
    /// Weight on the caller-assigned importance score
    pub importance: f64,
    /// Weight on creation recency
    pub recency: f64,
    /// Weight on access frequency
    pub access: f64,
}

impl PriorityWeights {
    /// Even blend; the fallback for intelligent reordering.
    pub const BALANCED: Self = Self {
        importance: 0.4,
        recency: 0.3,
        access: 0.3,
    };

    /// Importance-dominant blend.
    pub const IMPORTANCE: Self = Self {
        importance: 0.6,
        recency: 0.2,
        access: 0.2,
    };

    /// Recency-dominant blend.
    pub const RECENCY: Self = Self {
        importance: 0.2,
        recency: 0.6,
        access: 0.2,
    };

    /// Access-frequency-dominant blend.
    pub const ACCESS: Self = Self {
        importance: 0.2,
        recency: 0.2,
        access: 0.6,
    };
}

/// Deterministic retention score.
///
/// `importance * 0.4 + min(access * 0.1, 0.3) + recency * 0.2 + type bonus`,
/// where recency decays linearly over 30 days and knowledge/conversation
/// records get a +0.10/+0.05 bonus. Clamped to [0,1].
pub fn retention_heuristic(record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
    let recency = (1.0 - record.age_days(now) / RETENTION_RECENCY_DAYS).max(0.0);
    let mut score = record.importance_score * 0.4
        + (record.access_count as f64 * 0.1).min(0.3)
        + recency * 0.2;
    score += match record.memory_type {
        MemoryType::Knowledge => 0.10,
        MemoryType::Conversation => 0.05,
        _ => 0.0,
    };
    clamp_unit(score)
}

/// Deterministic priority score under the given weight preset.
///
/// Knowledge records get a +0.10 bonus and system events +0.05, independent
/// of the preset. Clamped to [0,1].
pub fn priority_heuristic(
    record: &MemoryRecord,
    now: DateTime<Utc>,
    weights: &PriorityWeights,
) -> f64 {
    let recency = (1.0 - record.age_days(now) / PRIORITY_RECENCY_DAYS).max(0.0);
    let access = (record.access_count as f64 / ACCESS_SATURATION).min(1.0);
    let mut score = record.importance_score * weights.importance
        + recency * weights.recency
        + access * weights.access;
    score += match record.memory_type {
        MemoryType::Knowledge => 0.10,
        MemoryType::SystemEvent => 0.05,
        _ => 0.0,
    };
    clamp_unit(score)
}

/// Computes batch scores, delegating to the oracle when enabled and falling
/// back to the heuristics on any failure. The public scoring methods never
/// fail; an oracle problem must not surface to callers.
pub struct ScoringEngine {
    oracle: Option<Arc<dyn ScoringOracle>>,
    ai_enabled: bool,
    oracle_timeout: Duration,
    max_batch: usize,
}

impl ScoringEngine {
    pub fn new(oracle: Option<Arc<dyn ScoringOracle>>, ai_enabled: bool) -> Self {
        Self {
            oracle,
            ai_enabled,
            oracle_timeout: Duration::from_secs(30),
            max_batch: 100,
        }
    }

    /// Bound the time one oracle call may take before heuristic fallback.
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Cap the number of records serialized into one oracle request.
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Whether the AI path is actually usable.
    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled && self.oracle.is_some()
    }

    /// Retention scores, one per record in input order.
    pub async fn retention_scores(&self, records: &[MemoryRecord]) -> Vec<f64> {
        if let Some(scores) = self.oracle_scores(ScoringKind::Retention, records).await {
            return scores;
        }
        let now = Utc::now();
        records
            .iter()
            .map(|record| retention_heuristic(record, now))
            .collect()
    }

    /// Priority scores, one per record in input order. The heuristic path
    /// uses the balanced preset.
    pub async fn priority_scores(&self, records: &[MemoryRecord]) -> Vec<f64> {
        if let Some(scores) = self.oracle_scores(ScoringKind::Priority, records).await {
            return scores;
        }
        let now = Utc::now();
        records
            .iter()
            .map(|record| priority_heuristic(record, now, &PriorityWeights::BALANCED))
            .collect()
    }

    /// Try the oracle path; `None` means "use the heuristic".
    async fn oracle_scores(&self, kind: ScoringKind, records: &[MemoryRecord]) -> Option<Vec<f64>> {
        if !self.ai_enabled() || records.is_empty() {
            return None;
        }
        let oracle = self.oracle.as_ref()?;

        let mut scores = Vec::with_capacity(records.len());
        for chunk in records.chunks(self.max_batch) {
            let snapshots: Vec<RecordSnapshot> = chunk
                .iter()
                .map(|record| RecordSnapshot::from_record(record, kind))
                .collect();

            match tokio::time::timeout(self.oracle_timeout, oracle.score(kind, &snapshots)).await {
                Ok(Ok(batch)) if batch.len() == chunk.len() => {
                    scores.extend(batch.into_iter().map(clamp_unit));
                }
                Ok(Ok(batch)) => {
                    warn!(
                        %kind,
                        expected = chunk.len(),
                        got = batch.len(),
                        "oracle returned wrong score count, falling back to heuristic"
                    );
                    return None;
                }
                Ok(Err(error)) => {
                    warn!(%kind, %error, "oracle scoring failed, falling back to heuristic");
                    return None;
                }
                Err(_) => {
                    warn!(
                        %kind,
                        timeout_secs = self.oracle_timeout.as_secs(),
                        "oracle scoring timed out, falling back to heuristic"
                    );
                    return None;
                }
            }
        }

        debug!(%kind, scored = scores.len(), "oracle scored batch");
        Some(scores)
    }
}
