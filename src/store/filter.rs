//! Predicate filter for record store queries.

use chrono::{DateTime, Utc};

use crate::record::{MemoryRecord, MemoryType};

/// Predicate set the engines query the store with.
///
/// Stores may translate these into native filtered queries or run a full
/// scan with [`RecordFilter::matches`]; behavioral equivalence is the
/// contract. `archived` is a tri-state: `None` matches both archived and
/// active records.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Restrict to one session partition
    pub session_id: Option<String>,
    /// Exact memory-type match
    pub memory_type: Option<MemoryType>,
    /// Case-insensitive substring match on content
    pub content_substring: Option<String>,
    /// Every supplied tag must be present on the record
    pub tags: Option<Vec<String>>,
    /// Inclusive importance floor
    pub min_importance: Option<f64>,
    /// Exclusive importance ceiling
    pub importance_below: Option<f64>,
    /// Exclusive creation-time cutoff
    pub created_before: Option<DateTime<Utc>>,
    /// Exclusive access-count ceiling
    pub access_count_below: Option<u64>,
    /// `Some(false)` = active only, `Some(true)` = archived only
    pub archived: Option<bool>,
}

impl RecordFilter {
    /// Filter matching every record, archived or not.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching non-archived records only.
    pub fn active() -> Self {
        Self {
            archived: Some(false),
            ..Self::default()
        }
    }

    /// Filter matching archived records only.
    pub fn archived_only() -> Self {
        Self {
            archived: Some(true),
            ..Self::default()
        }
    }

    /// Restrict to one session.
    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Require an exact memory type.
    pub fn memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    /// Require a case-insensitive content substring.
    pub fn content_contains(mut self, needle: impl Into<String>) -> Self {
        self.content_substring = Some(needle.into());
        self
    }

    /// Require every given tag to be present.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Require importance at or above the floor.
    pub fn min_importance(mut self, score: f64) -> Self {
        self.min_importance = Some(score);
        self
    }

    /// Require importance strictly below the ceiling.
    pub fn importance_below(mut self, score: f64) -> Self {
        self.importance_below = Some(score);
        self
    }

    /// Require creation strictly before the cutoff.
    pub fn created_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.created_before = Some(cutoff);
        self
    }

    /// Require an access count strictly below the ceiling.
    pub fn access_count_below(mut self, count: u64) -> Self {
        self.access_count_below = Some(count);
        self
    }

    /// Evaluate the full predicate set against one record.
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(archived) = self.archived {
            if record.is_archived != archived {
                return false;
            }
        }
        if let Some(session_id) = &self.session_id {
            if &record.session_id != session_id {
                return false;
            }
        }
        if let Some(memory_type) = &self.memory_type {
            if &record.memory_type != memory_type {
                return false;
            }
        }
        if let Some(needle) = &self.content_substring {
            if !record
                .content
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().all(|tag| record.has_tag(tag)) {
                return false;
            }
        }
        if let Some(floor) = self.min_importance {
            if record.importance_score < floor {
                return false;
            }
        }
        if let Some(ceiling) = self.importance_below {
            if record.importance_score >= ceiling {
                return false;
            }
        }
        if let Some(cutoff) = self.created_before {
            if record.created_at >= cutoff {
                return false;
            }
        }
        if let Some(ceiling) = self.access_count_below {
            if record.access_count >= ceiling {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_record(session: &str, importance: f64) -> MemoryRecord {
        MemoryRecord::new(
            session,
            "User asked about hotels in Paris",
            MemoryType::Conversation,
            importance,
            vec!["paris".to_string(), "hotels".to_string()],
        )
    }

    #[test]
    fn test_empty_filter_matches_active_and_archived() {
        let mut record = make_record("s1", 0.5);
        assert!(RecordFilter::new().matches(&record));

        record.archive("test");
        assert!(RecordFilter::new().matches(&record));
        assert!(!RecordFilter::active().matches(&record));
        assert!(RecordFilter::archived_only().matches(&record));
    }

    #[test]
    fn test_session_scope() {
        let record = make_record("s1", 0.5);
        assert!(RecordFilter::active().in_session("s1").matches(&record));
        assert!(!RecordFilter::active().in_session("s2").matches(&record));
    }

    #[test]
    fn test_content_substring_is_case_insensitive() {
        let record = make_record("s1", 0.5);
        assert!(RecordFilter::active()
            .content_contains("PARIS")
            .matches(&record));
        assert!(!RecordFilter::active()
            .content_contains("tokyo")
            .matches(&record));
    }

    #[test]
    fn test_tags_all_must_match() {
        let record = make_record("s1", 0.5);
        let both = RecordFilter::active().with_tags(vec!["paris".into(), "hotels".into()]);
        let missing = RecordFilter::active().with_tags(vec!["paris".into(), "flights".into()]);

        assert!(both.matches(&record));
        assert!(!missing.matches(&record));
    }

    #[test]
    fn test_importance_bounds() {
        let record = make_record("s1", 0.5);

        assert!(RecordFilter::active().min_importance(0.5).matches(&record));
        assert!(!RecordFilter::active().min_importance(0.6).matches(&record));
        assert!(RecordFilter::active().importance_below(0.6).matches(&record));
        assert!(!RecordFilter::active()
            .importance_below(0.5)
            .matches(&record));
    }

    #[test]
    fn test_created_before_is_exclusive() {
        let record = make_record("s1", 0.5);

        let future = record.created_at + Duration::seconds(1);
        assert!(RecordFilter::active().created_before(future).matches(&record));
        assert!(!RecordFilter::active()
            .created_before(record.created_at)
            .matches(&record));
    }

    #[test]
    fn test_access_count_below() {
        let mut record = make_record("s1", 0.5);
        record.access_count = 3;

        assert!(RecordFilter::active().access_count_below(4).matches(&record));
        assert!(!RecordFilter::active().access_count_below(3).matches(&record));
    }
}
