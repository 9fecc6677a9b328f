//! Request types for the scoring oracle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::MemoryRecord;

/// Which score the oracle is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringKind {
    /// Retention value for pruning decisions
    Retention,
    /// Display/retrieval priority for reordering
    Priority,
}

impl ScoringKind {
    /// Content excerpt length included in the request payload.
    pub fn excerpt_len(self) -> usize {
        match self {
            Self::Retention => 200,
            Self::Priority => 150,
        }
    }

    /// Instruction sent alongside the serialized records.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Retention => {
                "You are an AI memory manager. Score each memory for retention \
                 (0.0 = discard, 1.0 = keep). Consider importance, relevance, recency, \
                 uniqueness, and actionability. Respond with a JSON array of floats, \
                 one per memory, in input order."
            }
            Self::Priority => {
                "You are an AI memory prioritization system. Assign each memory a \
                 priority score between 0.0 and 1.0. Respond with a JSON array of \
                 floats, one per memory, in input order."
            }
        }
    }
}

impl std::fmt::Display for ScoringKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retention => write!(f, "retention"),
            Self::Priority => write!(f, "priority"),
        }
    }
}

/// Compact record view serialized into oracle requests.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSnapshot {
    pub id: String,
    pub content: String,
    pub memory_type: String,
    pub importance_score: f64,
    pub access_count: u64,
    pub created_at: DateTime<Utc>,
}

impl RecordSnapshot {
    /// Build a snapshot with content truncated for the given scoring kind.
    pub fn from_record(record: &MemoryRecord, kind: ScoringKind) -> Self {
        let cut = record
            .content
            .char_indices()
            .nth(kind.excerpt_len())
            .map_or(record.content.len(), |(idx, _)| idx);

        Self {
            id: record.id.to_string(),
            content: record.content[..cut].to_string(),
            memory_type: record.memory_type.to_string(),
            importance_score: record.importance_score,
            access_count: record.access_count,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemoryType;

    #[test]
    fn test_snapshot_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let record = MemoryRecord::new("s", long, MemoryType::Conversation, 0.5, vec![]);

        let snapshot = RecordSnapshot::from_record(&record, ScoringKind::Retention);
        assert_eq!(snapshot.content.chars().count(), 200);

        let snapshot = RecordSnapshot::from_record(&record, ScoringKind::Priority);
        assert_eq!(snapshot.content.chars().count(), 150);
    }

    #[test]
    fn test_snapshot_keeps_short_content_whole() {
        let record = MemoryRecord::new("s", "short", MemoryType::Knowledge, 0.9, vec![]);
        let snapshot = RecordSnapshot::from_record(&record, ScoringKind::Retention);

        assert_eq!(snapshot.content, "short");
        assert_eq!(snapshot.memory_type, "knowledge");
        assert_eq!(snapshot.importance_score, 0.9);
    }
}
