//! In-memory record store, bucketed by session partition.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::record::{MemoryRecord, RecordId};

use super::filter::RecordFilter;
use super::RecordStore;

/// Process-local store. Not persistent; suitable for tests and agents whose
/// memory lives only as long as the process.
pub struct InMemoryStore {
    /// session_id -> record id -> record
    sessions: RwLock<HashMap<String, HashMap<String, MemoryRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MemoryRecord>> {
        let sessions = self.sessions.read().await;
        let mut matches: Vec<MemoryRecord> = match &filter.session_id {
            Some(session_id) => sessions
                .get(session_id)
                .map(|bucket| {
                    bucket
                        .values()
                        .filter(|record| filter.matches(record))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => sessions
                .values()
                .flat_map(|bucket| bucket.values())
                .filter(|record| filter.matches(record))
                .cloned()
                .collect(),
        };
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }

    async fn get(&self, id: &RecordId, session_id: &str) -> Result<Option<MemoryRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .and_then(|bucket| bucket.get(&id.to_string()))
            .cloned())
    }

    async fn upsert(&self, record: &MemoryRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(record.session_id.clone())
            .or_default()
            .insert(record.id.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &RecordId, session_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .get_mut(session_id)
            .map(|bucket| bucket.remove(&id.to_string()).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemoryType;

    fn make_record(session: &str, content: &str, importance: f64) -> MemoryRecord {
        MemoryRecord::new(session, content, MemoryType::Conversation, importance, vec![])
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = InMemoryStore::new();
        let record = make_record("s1", "hello", 0.5);

        store.upsert(&record).await.unwrap();
        let loaded = store.get(&record.id, "s1").await.unwrap().unwrap();

        assert_eq!(loaded, record);
        assert!(store.get(&record.id, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = InMemoryStore::new();
        let mut record = make_record("s1", "hello", 0.5);
        store.upsert(&record).await.unwrap();

        record.set_importance(0.9);
        store.upsert(&record).await.unwrap();

        let loaded = store.get(&record.id, "s1").await.unwrap().unwrap();
        assert_eq!(loaded.importance_score, 0.9);
        assert_eq!(store.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_scoped_to_session() {
        let store = InMemoryStore::new();
        store.upsert(&make_record("s1", "a", 0.5)).await.unwrap();
        store.upsert(&make_record("s1", "b", 0.5)).await.unwrap();
        store.upsert(&make_record("s2", "c", 0.5)).await.unwrap();

        let s1 = store
            .query(&RecordFilter::active().in_session("s1"))
            .await
            .unwrap();
        let all = store.query(&RecordFilter::active()).await.unwrap();

        assert_eq!(s1.len(), 2);
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_query_excludes_archived_by_default_filter() {
        let store = InMemoryStore::new();
        let mut archived = make_record("s1", "old", 0.2);
        archived.archive("test");
        store.upsert(&archived).await.unwrap();
        store.upsert(&make_record("s1", "new", 0.8)).await.unwrap();

        let active = store.query(&RecordFilter::active()).await.unwrap();
        let archived_only = store.query(&RecordFilter::archived_only()).await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].content, "new");
        assert_eq!(archived_only.len(), 1);
        assert_eq!(archived_only[0].content, "old");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        let record = make_record("s1", "hello", 0.5);
        store.upsert(&record).await.unwrap();

        assert!(store.delete(&record.id, "s1").await.unwrap());
        assert!(!store.delete(&record.id, "s1").await.unwrap());
        assert!(store.get(&record.id, "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_importance_predicates() {
        let store = InMemoryStore::new();
        store.upsert(&make_record("s1", "low", 0.1)).await.unwrap();
        store.upsert(&make_record("s1", "mid", 0.5)).await.unwrap();
        store.upsert(&make_record("s1", "high", 0.9)).await.unwrap();

        let below = store
            .query(&RecordFilter::active().importance_below(0.5))
            .await
            .unwrap();
        let floor = store
            .query(&RecordFilter::active().min_importance(0.5))
            .await
            .unwrap();

        assert_eq!(below.len(), 1);
        assert_eq!(below[0].content, "low");
        assert_eq!(floor.len(), 2);
    }
}
