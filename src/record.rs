//! Memory record types: the stored unit of agent experience.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a memory record.
///
/// Serialized as its string form; the physical store key is the
/// `(session_id, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categorical tag for a memory record.
///
/// The set is open for extensibility: unknown tags round-trip through
/// [`MemoryType::Other`] without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemoryType {
    /// A conversation turn
    Conversation,
    /// A tool invocation issued by the agent
    ToolCall,
    /// The result returned by a tool
    ToolResult,
    /// An internal system event
    SystemEvent,
    /// Durable knowledge worth keeping across sessions
    Knowledge,
    /// Any other caller-defined category
    Other(String),
}

impl From<String> for MemoryType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "conversation" => Self::Conversation,
            "tool_call" => Self::ToolCall,
            "tool_result" => Self::ToolResult,
            "system_event" => Self::SystemEvent,
            "knowledge" => Self::Knowledge,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for MemoryType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<MemoryType> for String {
    fn from(value: MemoryType) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conversation => write!(f, "conversation"),
            Self::ToolCall => write!(f, "tool_call"),
            Self::ToolResult => write!(f, "tool_result"),
            Self::SystemEvent => write!(f, "system_event"),
            Self::Knowledge => write!(f, "knowledge"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One stored memory record.
///
/// `session_id` partitions records into conversation scope and never changes
/// after creation. `importance_score` is clamped into [0,1] at every write.
/// Archived records stay in the store but are excluded from active queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, generated at creation
    pub id: RecordId,
    /// Partition key grouping records into one conversation scope
    pub session_id: String,
    /// Free-form text payload
    pub content: String,
    /// Categorical tag
    pub memory_type: MemoryType,
    /// Caller-assigned relevance weight in [0,1]
    pub importance_score: f64,
    /// Free-form labels; matching is duplicate- and order-insensitive
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation timestamp, immutable
    pub created_at: DateTime<Utc>,
    /// Last retrieval timestamp
    pub last_accessed: DateTime<Utc>,
    /// Number of times the record was retrieved
    #[serde(default)]
    pub access_count: u64,
    /// Cached output of the reordering engine; absent until first reorder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,
    /// When the reordering engine last touched this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reordered: Option<DateTime<Utc>>,
    /// Archived records are hidden from active queries but retained
    #[serde(default)]
    pub is_archived: bool,
    /// Retention score assigned by the AI-optimized pruning path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_retention_score: Option<f64>,
    /// When the record was archived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    /// Why the record was archived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_reason: Option<String>,
}

impl MemoryRecord {
    /// Create a new active record with a fresh id and zero access count.
    pub fn new(
        session_id: impl Into<String>,
        content: impl Into<String>,
        memory_type: MemoryType,
        importance_score: f64,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            session_id: session_id.into(),
            content: content.into(),
            memory_type,
            importance_score: clamp_unit(importance_score),
            tags,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            priority_score: None,
            last_reordered: None,
            is_archived: false,
            ai_retention_score: None,
            archived_at: None,
            archive_reason: None,
        }
    }

    /// Register a retrieval: bump the access count and last-accessed stamp.
    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    /// Overwrite the importance score, clamped into [0,1].
    pub fn set_importance(&mut self, score: f64) {
        self.importance_score = clamp_unit(score);
    }

    /// Mark the record archived with the given reason.
    pub fn archive(&mut self, reason: impl Into<String>) {
        self.is_archived = true;
        self.archived_at = Some(Utc::now());
        self.archive_reason = Some(reason.into());
    }

    /// Age of the record in fractional days as of `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds() as f64 / 86_400.0
    }

    /// Whether the record carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Clamp a score into the unit interval. NaN collapses to 0.0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    value.max(0.0).min(1.0)
}
