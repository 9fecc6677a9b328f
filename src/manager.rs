//! The memory manager façade.
//!
//! [`LongTermMemory`] is the single entry point consumed by the agent
//! runtime. The record store and (optionally) the scoring oracle are
//! injected at construction time; there is no global client state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::oracle::ScoringOracle;
use crate::pruning::{PruneStrategy, PruningEngine};
use crate::record::{clamp_unit, MemoryRecord, MemoryType, RecordId};
use crate::reordering::{ReorderStrategy, ReorderingEngine};
use crate::scoring::ScoringEngine;
use crate::store::{RecordFilter, RecordStore};

/// Configuration for the memory manager.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Capacity bound enforced by hybrid and AI-optimized pruning
    pub max_memories: usize,
    /// Floor below which the importance strategy deletes, in [0,1]
    pub importance_threshold: f64,
    /// Whether oracle-delegated scoring is attempted at all
    pub enable_ai_scoring: bool,
    /// Age cutoff in days for the age pruning strategy
    pub prune_age_days: i64,
    /// Access floor for the access-frequency pruning strategy
    pub min_access_count: u64,
    /// Age cutoff in days for the archive-by-age optimization pass
    pub archive_after_days: i64,
    /// Run a hybrid prune automatically when an add pushes the active
    /// population over capacity
    pub auto_prune: bool,
    /// Purge archived records this many days after archival; `None` keeps
    /// them forever
    pub archived_retention_days: Option<i64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memories: 1000,
            importance_threshold: 0.3,
            enable_ai_scoring: true,
            prune_age_days: 30,
            min_access_count: 2,
            archive_after_days: 90,
            auto_prune: false,
            archived_retention_days: None,
        }
    }
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_memories(mut self, max_memories: usize) -> Self {
        self.max_memories = max_memories;
        self
    }

    pub fn with_importance_threshold(mut self, threshold: f64) -> Self {
        self.importance_threshold = clamp_unit(threshold);
        self
    }

    pub fn with_ai_scoring(mut self, enabled: bool) -> Self {
        self.enable_ai_scoring = enabled;
        self
    }

    pub fn with_auto_prune(mut self, enabled: bool) -> Self {
        self.auto_prune = enabled;
        self
    }

    pub fn with_archived_retention_days(mut self, days: i64) -> Self {
        self.archived_retention_days = Some(days);
        self
    }
}

/// Search parameters for [`LongTermMemory::search_memories`].
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Session scope (required)
    pub session_id: String,
    /// Case-insensitive substring match on content
    pub query: Option<String>,
    /// Exact memory-type match
    pub memory_type: Option<MemoryType>,
    /// Every supplied tag must be present
    pub tags: Option<Vec<String>>,
    /// Inclusive importance floor
    pub min_importance: f64,
    /// Maximum number of results
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            query: None,
            memory_type: None,
            tags: None,
            min_importance: 0.0,
            limit: 10,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_min_importance(mut self, floor: f64) -> Self {
        self.min_importance = floor;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Aggregate statistics over the non-archived population.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStatistics {
    pub total_memories: usize,
    pub memory_types: HashMap<String, usize>,
    pub average_importance: f64,
    pub average_access_count: f64,
    pub oldest_memory: Option<DateTime<Utc>>,
    pub newest_memory: Option<DateTime<Utc>>,
}

impl MemoryStatistics {
    fn from_records(records: &[MemoryRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut memory_types: HashMap<String, usize> = HashMap::new();
        for record in records {
            *memory_types
                .entry(record.memory_type.to_string())
                .or_insert(0) += 1;
        }

        let count = records.len() as f64;
        Self {
            total_memories: records.len(),
            memory_types,
            average_importance: records.iter().map(|r| r.importance_score).sum::<f64>() / count,
            average_access_count: records.iter().map(|r| r.access_count as f64).sum::<f64>()
                / count,
            oldest_memory: records.iter().map(|r| r.created_at).min(),
            newest_memory: records.iter().map(|r| r.created_at).max(),
        }
    }
}

/// Efficiency metrics computed at the end of an optimization run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_memories: usize,
    pub active_memories: usize,
    pub archived_memories: usize,
    /// active / (active + archived)
    pub memory_efficiency: f64,
    /// active / max_memories
    pub storage_utilization: f64,
    pub optimization_score: f64,
    /// First stage failure encountered, if any
    pub error: Option<String>,
}

/// Outcome of one `optimize_memory_performance` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizationReport {
    pub pruned_memories: usize,
    pub reordered_memories: usize,
    pub archived_memories: usize,
    pub purged_memories: usize,
    pub optimization_time_ms: u64,
    pub performance: PerformanceMetrics,
}

/// High-level manager for long-term memory: adds, retrieves, and updates
/// records, and orchestrates pruning, reordering, and optimization.
pub struct LongTermMemory {
    store: Arc<dyn RecordStore>,
    pruning: PruningEngine,
    reordering: ReorderingEngine,
    config: MemoryConfig,
}

impl LongTermMemory {
    /// Build a manager with heuristic-only scoring.
    pub fn new(store: Arc<dyn RecordStore>, config: MemoryConfig) -> Self {
        Self::build(store, None, config)
    }

    /// Build a manager that consults the given oracle when AI scoring is
    /// enabled in the config.
    pub fn with_oracle(
        store: Arc<dyn RecordStore>,
        oracle: Arc<dyn ScoringOracle>,
        config: MemoryConfig,
    ) -> Self {
        Self::build(store, Some(oracle), config)
    }

    fn build(
        store: Arc<dyn RecordStore>,
        oracle: Option<Arc<dyn ScoringOracle>>,
        config: MemoryConfig,
    ) -> Self {
        let scoring = Arc::new(ScoringEngine::new(oracle, config.enable_ai_scoring));
        let pruning = PruningEngine::new(Arc::clone(&store), Arc::clone(&scoring));
        let reordering = ReorderingEngine::new(Arc::clone(&store), scoring);
        Self {
            store,
            pruning,
            reordering,
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Persist a new memory. Importance is clamped into [0,1]; storage
    /// failures propagate.
    pub async fn add_memory(
        &self,
        session_id: impl Into<String>,
        content: impl Into<String>,
        memory_type: MemoryType,
        importance_score: f64,
        tags: Vec<String>,
    ) -> Result<MemoryRecord> {
        let record = MemoryRecord::new(session_id, content, memory_type, importance_score, tags);
        self.store.upsert(&record).await?;
        info!(id = %record.id, importance = record.importance_score, "added memory");

        if self.config.auto_prune {
            self.auto_prune_if_over_capacity().await;
        }
        Ok(record)
    }

    /// Point read that registers the access: bumps `access_count` and
    /// `last_accessed` and persists the bump.
    pub async fn get_memory(
        &self,
        id: &RecordId,
        session_id: &str,
    ) -> Result<Option<MemoryRecord>> {
        let Some(mut record) = self.store.get(id, session_id).await? else {
            return Ok(None);
        };
        record.record_access();
        self.store.upsert(&record).await?;
        Ok(Some(record))
    }

    /// Search non-archived memories in one session.
    ///
    /// Results are ordered by importance descending with ties broken by
    /// creation time, most recent first. Returned records have their access
    /// count incremented; a failed count write is logged, not surfaced.
    pub async fn search_memories(&self, request: &SearchRequest) -> Result<Vec<MemoryRecord>> {
        let mut filter = RecordFilter::active()
            .in_session(&request.session_id)
            .min_importance(request.min_importance);
        if let Some(query) = &request.query {
            filter = filter.content_contains(query.clone());
        }
        if let Some(memory_type) = &request.memory_type {
            filter = filter.memory_type(memory_type.clone());
        }
        if let Some(tags) = &request.tags {
            filter = filter.with_tags(tags.clone());
        }

        let mut matches = self.store.query(&filter).await?;
        matches.sort_by(|a, b| {
            b.importance_score
                .partial_cmp(&a.importance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        matches.truncate(request.limit);

        for record in &mut matches {
            record.record_access();
            if let Err(error) = self.store.upsert(record).await {
                warn!(id = %record.id, %error, "failed to persist access count");
            }
        }

        debug!(
            session_id = %request.session_id,
            hits = matches.len(),
            "searched memories"
        );
        Ok(matches)
    }

    /// Overwrite a record's importance, clamped into [0,1]. Fails with
    /// [`Error::NotFound`] when `(id, session_id)` does not exist.
    pub async fn update_memory_importance(
        &self,
        id: &RecordId,
        session_id: &str,
        new_score: f64,
    ) -> Result<()> {
        let Some(mut record) = self.store.get(id, session_id).await? else {
            return Err(Error::not_found(id.to_string(), session_id));
        };
        record.set_importance(new_score);
        self.store.upsert(&record).await?;
        info!(id = %record.id, importance = record.importance_score, "updated memory importance");
        Ok(())
    }

    /// Aggregate statistics over non-archived records, optionally scoped to
    /// one session. An empty scope yields zeroed statistics, never an error.
    pub async fn get_memory_statistics(
        &self,
        session_id: Option<&str>,
    ) -> Result<MemoryStatistics> {
        let mut filter = RecordFilter::active();
        if let Some(session_id) = session_id {
            filter = filter.in_session(session_id);
        }
        let records = self.store.query(&filter).await?;
        Ok(MemoryStatistics::from_records(&records))
    }

    /// Run one pruning strategy. Returns the number of records removed or
    /// archived; never raises (a failed candidate query counts as 0).
    pub async fn prune_memories(&self, strategy: PruneStrategy) -> usize {
        match strategy {
            PruneStrategy::Importance => {
                self.pruning
                    .prune_by_importance(self.config.importance_threshold)
                    .await
            }
            PruneStrategy::Age => self.pruning.prune_by_age(self.config.prune_age_days).await,
            PruneStrategy::AccessFrequency => {
                self.pruning
                    .prune_by_access_frequency(self.config.min_access_count)
                    .await
            }
            PruneStrategy::Hybrid => self.pruning.prune_hybrid(self.config.max_memories).await,
            PruneStrategy::AiOptimized => {
                self.pruning
                    .prune_ai_optimized(self.config.max_memories)
                    .await
            }
        }
    }

    /// Recompute priority scores for one session. Returns the count of
    /// records updated; never raises.
    pub async fn reorder_memories(&self, session_id: &str, strategy: ReorderStrategy) -> usize {
        self.reordering.reorder(session_id, strategy).await
    }

    /// Full optimization pass: AI pruning (when enabled), intelligent
    /// reordering across all sessions, archive-by-age, optional archived
    /// purge, and efficiency metrics. Never raises; a stage failure is
    /// captured into `performance.error` while the other stages still run.
    pub async fn optimize_memory_performance(&self) -> OptimizationReport {
        let started = Instant::now();
        let mut report = OptimizationReport::default();
        let mut stage_error: Option<String> = None;

        report.pruned_memories = if self.config.enable_ai_scoring {
            self.pruning
                .prune_ai_optimized(self.config.max_memories)
                .await
        } else {
            debug!("AI scoring disabled, skipping AI pruning stage");
            0
        };

        match self.store.query(&RecordFilter::active()).await {
            Ok(records) => {
                report.reordered_memories = self.reordering.reorder_intelligent(records).await;
            }
            Err(error) => {
                warn!(%error, "optimization: could not enumerate records for reordering");
                stage_error = Some(error.to_string());
            }
        }

        report.archived_memories = self
            .pruning
            .archive_old(self.config.archive_after_days, self.config.importance_threshold)
            .await;

        if let Some(days) = self.config.archived_retention_days {
            report.purged_memories = self.pruning.purge_archived(days).await;
        }

        report.performance = self.performance_metrics().await;
        if report.performance.error.is_none() {
            report.performance.error = stage_error;
        }
        report.optimization_time_ms = started.elapsed().as_millis() as u64;

        info!(
            pruned = report.pruned_memories,
            reordered = report.reordered_memories,
            archived = report.archived_memories,
            elapsed_ms = report.optimization_time_ms,
            "optimization pass complete"
        );
        report
    }

    /// Hard-delete archived records past the configured retention window.
    /// Returns 0 when no window is configured.
    pub async fn purge_archived(&self) -> usize {
        match self.config.archived_retention_days {
            Some(days) => self.pruning.purge_archived(days).await,
            None => 0,
        }
    }

    async fn auto_prune_if_over_capacity(&self) {
        match self.store.count(&RecordFilter::active()).await {
            Ok(count) if count > self.config.max_memories => {
                let pruned = self.pruning.prune_hybrid(self.config.max_memories).await;
                debug!(pruned, "auto-pruned over-capacity memories");
            }
            Ok(_) => {}
            Err(error) => warn!(%error, "capacity check failed, skipping auto-prune"),
        }
    }

    async fn performance_metrics(&self) -> PerformanceMetrics {
        let active = match self.store.count(&RecordFilter::active()).await {
            Ok(count) => count,
            Err(error) => {
                return PerformanceMetrics {
                    error: Some(error.to_string()),
                    ..PerformanceMetrics::default()
                }
            }
        };
        let archived = match self.store.count(&RecordFilter::archived_only()).await {
            Ok(count) => count,
            Err(error) => {
                return PerformanceMetrics {
                    error: Some(error.to_string()),
                    ..PerformanceMetrics::default()
                }
            }
        };

        let total = active + archived;
        let efficiency = active as f64 / total.max(1) as f64;
        let utilization = active as f64 / self.config.max_memories.max(1) as f64;

        PerformanceMetrics {
            total_memories: total,
            active_memories: active,
            archived_memories: archived,
            memory_efficiency: efficiency,
            storage_utilization: utilization,
            optimization_score: (efficiency * (1.0 - utilization)).min(1.0),
            error: None,
        }
    }
}
