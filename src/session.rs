//! Short-term session memory with sliding-window eviction.
//!
//! Unlike the long-term store, the short-term window is a plain in-process
//! value: conversation turns, tool calls, and system events for the current
//! session, bounded by an item count and an approximate token budget.
//! Oldest items are evicted first; the newest item is always retained.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Result;

/// Role attributed to a short-term memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System event or instruction
    System,
    /// User/human input
    User,
    /// Assistant/model output (including tool calls it issued)
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One item in the sliding window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermItem {
    /// Who produced the item
    pub role: Role,
    /// Text content
    pub content: String,
    /// Approximate token cost of the content
    pub tokens: usize,
    /// When the item was added
    pub timestamp: DateTime<Utc>,
    /// Structured payload for tool calls and system events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl ShortTermItem {
    fn new(role: Role, content: String, metadata: Option<HashMap<String, Value>>) -> Self {
        let tokens = approx_tokens(&content);
        Self {
            role,
            content,
            tokens,
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Approximate token count: ~4 chars per token for English text.
fn approx_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Usage snapshot for the window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub session_id: String,
    pub total_items: usize,
    pub total_tokens: usize,
    pub max_items: usize,
    pub max_tokens: usize,
    pub usage_percent: f64,
    pub oldest_item: Option<DateTime<Utc>>,
    pub newest_item: Option<DateTime<Utc>>,
}

/// Sliding-window conversation memory for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermMemory {
    /// Generated at creation; survives export/import
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    max_items: usize,
    max_tokens: usize,
    items: Vec<ShortTermItem>,
    total_tokens: usize,
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::new(10, 2000)
    }
}

impl ShortTermMemory {
    pub fn new(max_items: usize, max_tokens: usize) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            max_items,
            max_tokens,
            items: Vec::new(),
            total_tokens: 0,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn items(&self) -> &[ShortTermItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a conversation turn.
    pub fn add_conversation(&mut self, role: Role, content: impl Into<String>) {
        self.push(ShortTermItem::new(role, content.into(), None));
    }

    /// Add a conversation turn with caller-supplied metadata.
    pub fn add_conversation_with_metadata(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: HashMap<String, Value>,
    ) {
        self.push(ShortTermItem::new(role, content.into(), Some(metadata)));
    }

    /// Record a tool invocation with its input and output payloads.
    pub fn add_tool_call(&mut self, tool_name: &str, input: Value, output: Value, success: bool) {
        let metadata = HashMap::from([
            ("type".to_string(), json!("tool_call")),
            ("tool_name".to_string(), json!(tool_name)),
            ("input".to_string(), input),
            ("output".to_string(), output),
            ("success".to_string(), json!(success)),
        ]);
        self.push(ShortTermItem::new(
            Role::Assistant,
            format!("Tool call: {}", tool_name),
            Some(metadata),
        ));
    }

    /// Record a system event with a structured payload.
    pub fn add_system_event(&mut self, event: &str, data: Value) {
        let metadata = HashMap::from([
            ("type".to_string(), json!("system_event")),
            ("event".to_string(), json!(event)),
            ("data".to_string(), data),
        ]);
        self.push(ShortTermItem::new(
            Role::System,
            event.to_string(),
            Some(metadata),
        ));
    }

    fn push(&mut self, item: ShortTermItem) {
        self.total_tokens += item.tokens;
        self.items.push(item);
        self.evict();
    }

    fn evict(&mut self) {
        while self.items.len() > self.max_items
            || (self.total_tokens > self.max_tokens && self.items.len() > 1)
        {
            let evicted = self.items.remove(0);
            self.total_tokens -= evicted.tokens;
        }
    }

    /// The last `n` items, oldest first.
    pub fn recent(&self, n: usize) -> &[ShortTermItem] {
        let start = self.items.len().saturating_sub(n);
        &self.items[start..]
    }

    /// Case-insensitive substring search over item content, optionally
    /// restricted to one role.
    pub fn search(&self, query: &str, role: Option<Role>) -> Vec<&ShortTermItem> {
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(|item| role.map_or(true, |r| item.role == r))
            .filter(|item| item.content.to_lowercase().contains(&needle))
            .collect()
    }

    /// Usage snapshot.
    pub fn summary(&self) -> WindowSummary {
        WindowSummary {
            session_id: self.session_id.clone(),
            total_items: self.items.len(),
            total_tokens: self.total_tokens,
            max_items: self.max_items,
            max_tokens: self.max_tokens,
            usage_percent: if self.max_items == 0 {
                0.0
            } else {
                self.items.len() as f64 / self.max_items as f64 * 100.0
            },
            oldest_item: self.items.first().map(|item| item.timestamp),
            newest_item: self.items.last().map(|item| item.timestamp),
        }
    }

    /// Render the window as `ROLE: content` lines, oldest first, keeping
    /// the most recent items that fit in `max_tokens` (defaults to the
    /// window budget).
    pub fn context_window(&self, max_tokens: Option<usize>) -> String {
        let budget = max_tokens.unwrap_or(self.max_tokens);
        let mut selected: Vec<&ShortTermItem> = Vec::new();
        let mut used = 0;
        for item in self.items.iter().rev() {
            if used + item.tokens > budget {
                break;
            }
            used += item.tokens;
            selected.push(item);
        }
        selected.reverse();

        selected
            .iter()
            .map(|item| format!("{}: {}", item.role.to_string().to_uppercase(), item.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop all items and reset the token counter.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_tokens = 0;
    }

    /// Serialize the full window, including identity and limits.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a window previously serialized with [`Self::to_json`].
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
