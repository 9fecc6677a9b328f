//! SQLite-backed record store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::record::{MemoryRecord, MemoryType, RecordId};

use super::filter::RecordFilter;
use super::schema::{initialize_schema, is_initialized};
use super::RecordStore;

/// Embedded persistent store.
///
/// All filter predicates except tag membership are pushed into SQL; tag
/// matching runs over the decoded rows.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::Storage(e.to_string()))?;

        if !is_initialized(&conn) {
            initialize_schema(&conn).map_err(|e| Error::Storage(e.to_string()))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Storage(e.to_string()))?;
        initialize_schema(&conn).map_err(|e| Error::Storage(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Storage(format!("Failed to lock connection: {}", e)))?;
        f(&conn).map_err(|e| Error::Storage(e.to_string()))
    }

    fn push_predicates(
        filter: &RecordFilter,
        sql: &mut String,
        params_vec: &mut Vec<Box<dyn rusqlite::ToSql>>,
    ) {
        if let Some(ref session_id) = filter.session_id {
            sql.push_str(" AND session_id = ?");
            params_vec.push(Box::new(session_id.clone()));
        }
        if let Some(archived) = filter.archived {
            sql.push_str(" AND is_archived = ?");
            params_vec.push(Box::new(archived));
        }
        if let Some(ref memory_type) = filter.memory_type {
            sql.push_str(" AND memory_type = ?");
            params_vec.push(Box::new(memory_type.to_string()));
        }
        if let Some(ref needle) = filter.content_substring {
            sql.push_str(" AND instr(lower(content), lower(?)) > 0");
            params_vec.push(Box::new(needle.clone()));
        }
        if let Some(floor) = filter.min_importance {
            sql.push_str(" AND importance_score >= ?");
            params_vec.push(Box::new(floor));
        }
        if let Some(ceiling) = filter.importance_below {
            sql.push_str(" AND importance_score < ?");
            params_vec.push(Box::new(ceiling));
        }
        if let Some(cutoff) = filter.created_before {
            sql.push_str(" AND created_at < ?");
            params_vec.push(Box::new(format_datetime(cutoff)));
        }
        if let Some(ceiling) = filter.access_count_below {
            sql.push_str(" AND access_count < ?");
            params_vec.push(Box::new(ceiling as i64));
        }
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<MemoryRecord> {
        let id_str: String = row.get(0)?;
        let memory_type: String = row.get(3)?;
        let tags: Vec<String> = row
            .get::<_, Option<String>>(5)?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Ok(MemoryRecord {
            id: RecordId::parse(&id_str).unwrap_or_else(|_| RecordId::new()),
            session_id: row.get(1)?,
            content: row.get(2)?,
            memory_type: MemoryType::from(memory_type),
            importance_score: row.get(4)?,
            tags,
            created_at: parse_datetime(row.get::<_, String>(6)?),
            last_accessed: parse_datetime(row.get::<_, String>(7)?),
            access_count: row.get::<_, i64>(8)? as u64,
            priority_score: row.get(9)?,
            last_reordered: row.get::<_, Option<String>>(10)?.map(parse_datetime),
            is_archived: row.get(11)?,
            ai_retention_score: row.get(12)?,
            archived_at: row.get::<_, Option<String>>(13)?.map(parse_datetime),
            archive_reason: row.get(14)?,
        })
    }
}

const SELECT_COLUMNS: &str = "id, session_id, content, memory_type, importance_score, tags, \
     created_at, last_accessed, access_count, priority_score, last_reordered, \
     is_archived, ai_retention_score, archived_at, archive_reason";

#[async_trait]
impl RecordStore for SqliteStore {
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MemoryRecord>> {
        let records = self.with_conn(|conn| {
            let mut sql = format!("SELECT {} FROM records WHERE 1=1", SELECT_COLUMNS);
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            Self::push_predicates(filter, &mut sql, &mut params_vec);
            sql.push_str(" ORDER BY created_at ASC");

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params_refs.as_slice(), |row| Self::row_to_record(row))?
                .filter_map(|r| r.ok())
                .collect::<Vec<_>>();

            Ok(records)
        })?;

        // Tag membership is checked on the decoded rows
        let records = match &filter.tags {
            Some(tags) => records
                .into_iter()
                .filter(|record| tags.iter().all(|tag| record.has_tag(tag)))
                .collect(),
            None => records,
        };

        Ok(records)
    }

    async fn get(&self, id: &RecordId, session_id: &str) -> Result<Option<MemoryRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM records WHERE id = ?1 AND session_id = ?2",
                    SELECT_COLUMNS
                ),
                params![id.to_string(), session_id],
                |row| Self::row_to_record(row),
            )
            .optional()
        })
    }

    async fn upsert(&self, record: &MemoryRecord) -> Result<()> {
        let tags = serde_json::to_string(&record.tags)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO records (
                    id, session_id, content, memory_type, importance_score, tags,
                    created_at, last_accessed, access_count, priority_score, last_reordered,
                    is_archived, ai_retention_score, archived_at, archive_reason
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.id.to_string(),
                    record.session_id,
                    record.content,
                    record.memory_type.to_string(),
                    record.importance_score,
                    tags,
                    format_datetime(record.created_at),
                    format_datetime(record.last_accessed),
                    record.access_count as i64,
                    record.priority_score,
                    record.last_reordered.map(format_datetime),
                    record.is_archived,
                    record.ai_retention_score,
                    record.archived_at.map(format_datetime),
                    record.archive_reason,
                ],
            )?;
            Ok(())
        })
    }

    async fn delete(&self, id: &RecordId, session_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM records WHERE id = ?1 AND session_id = ?2",
                params![id.to_string(), session_id],
            )?;
            Ok(rows > 0)
        })
    }

    async fn count(&self, filter: &RecordFilter) -> Result<usize> {
        if filter.tags.is_some() {
            return Ok(self.query(filter).await?.len());
        }

        self.with_conn(|conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM records WHERE 1=1");
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            Self::push_predicates(filter, &mut sql, &mut params_vec);

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

/// Fixed-width RFC 3339 so lexicographic SQL comparison matches chronology.
fn format_datetime(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::Duration;

    fn make_record(session: &str, content: &str, importance: f64) -> MemoryRecord {
        MemoryRecord::new(
            session,
            content,
            MemoryType::Conversation,
            importance,
            vec!["seed".to_string()],
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let record = make_record("s1", "User booked a hotel", 0.7);

        store.upsert(&record).await.unwrap();
        let loaded = store.get(&record.id, "s1").await.unwrap().unwrap();

        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.content, record.content);
        assert_eq!(loaded.tags, record.tags);
        assert_eq!(loaded.importance_score, record.importance_score);
        assert!(store.get(&record.id, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let store = SqliteStore::in_memory().unwrap();
        let mut record = make_record("s1", "draft", 0.3);
        store.upsert(&record).await.unwrap();

        record.content = "final".to_string();
        record.record_access();
        store.upsert(&record).await.unwrap();

        let loaded = store.get(&record.id, "s1").await.unwrap().unwrap();
        assert_eq!(loaded.content, "final");
        assert_eq!(loaded.access_count, 1);
        assert_eq!(store.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::in_memory().unwrap();
        let record = make_record("s1", "gone soon", 0.5);
        store.upsert(&record).await.unwrap();

        assert!(store.delete(&record.id, "s1").await.unwrap());
        assert!(!store.delete(&record.id, "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_by_content_substring() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert(&make_record("s1", "Weather in Paris is sunny", 0.5))
            .await
            .unwrap();
        store
            .upsert(&make_record("s1", "Restaurants in Tokyo", 0.5))
            .await
            .unwrap();

        let hits = store
            .query(&RecordFilter::active().content_contains("PARIS"))
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("Paris"));
    }

    #[tokio::test]
    async fn test_query_archived_tri_state() {
        let store = SqliteStore::in_memory().unwrap();
        let mut archived = make_record("s1", "old", 0.2);
        archived.archive("test");
        store.upsert(&archived).await.unwrap();
        store.upsert(&make_record("s1", "new", 0.8)).await.unwrap();

        assert_eq!(store.query(&RecordFilter::active()).await.unwrap().len(), 1);
        assert_eq!(
            store
                .query(&RecordFilter::archived_only())
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.query(&RecordFilter::new()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_archive_bookkeeping_round_trips() {
        let store = SqliteStore::in_memory().unwrap();
        let mut record = make_record("s1", "to archive", 0.2);
        record.ai_retention_score = Some(0.15);
        record.archive("ai_retention");
        store.upsert(&record).await.unwrap();

        let loaded = store.get(&record.id, "s1").await.unwrap().unwrap();
        assert!(loaded.is_archived);
        assert_eq!(loaded.ai_retention_score, Some(0.15));
        assert_eq!(loaded.archive_reason.as_deref(), Some("ai_retention"));
        assert!(loaded.archived_at.is_some());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.db");
        let record = make_record("s1", "durable", 0.6);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert(&record).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.get(&record.id, "s1").await.unwrap().unwrap();
        assert_eq!(loaded.content, "durable");
    }

    /// Both backends must agree on every predicate combination.
    #[tokio::test]
    async fn test_filter_equivalence_with_in_memory_store() {
        let sqlite = SqliteStore::in_memory().unwrap();
        let memory = InMemoryStore::new();
        let now = Utc::now();

        let mut seeds = Vec::new();
        for i in 0..8i64 {
            let mut record = MemoryRecord::new(
                if i % 2 == 0 { "s1" } else { "s2" },
                format!("memory number {} about travel", i),
                if i % 3 == 0 {
                    MemoryType::Knowledge
                } else {
                    MemoryType::Conversation
                },
                i as f64 / 8.0,
                if i % 2 == 0 {
                    vec!["travel".to_string(), "hotel".to_string()]
                } else {
                    vec!["travel".to_string()]
                },
            );
            record.created_at = now - Duration::days(i * 10);
            record.access_count = i as u64;
            if i == 7 {
                record.archive("test");
            }
            seeds.push(record);
        }
        for record in &seeds {
            sqlite.upsert(record).await.unwrap();
            memory.upsert(record).await.unwrap();
        }

        let filters = vec![
            RecordFilter::active(),
            RecordFilter::archived_only(),
            RecordFilter::active().in_session("s1"),
            RecordFilter::active().memory_type(MemoryType::Knowledge),
            RecordFilter::active().min_importance(0.5),
            RecordFilter::active().importance_below(0.25),
            RecordFilter::active().created_before(now - Duration::days(25)),
            RecordFilter::active().access_count_below(3),
            RecordFilter::active().content_contains("TRAVEL"),
            RecordFilter::active().with_tags(vec!["hotel".to_string()]),
            RecordFilter::active()
                .in_session("s1")
                .min_importance(0.2)
                .access_count_below(7),
        ];

        for filter in filters {
            let mut from_sqlite: Vec<String> = sqlite
                .query(&filter)
                .await
                .unwrap()
                .iter()
                .map(|r| r.id.to_string())
                .collect();
            let mut from_memory: Vec<String> = memory
                .query(&filter)
                .await
                .unwrap()
                .iter()
                .map(|r| r.id.to_string())
                .collect();
            from_sqlite.sort();
            from_memory.sort();
            assert_eq!(from_sqlite, from_memory, "filter disagreement: {:?}", filter);
        }
    }
}
