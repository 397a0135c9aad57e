//! Conversation persistence
//!
//! A conversation id maps to the full transcript plus the metadata of the
//! last request that touched it. Stores never interpret either.

use crate::error::StoreError;
use crate::message::Transcript;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// What is persisted for one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub transcript: Transcript,
    pub metadata: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// `None` for a conversation that was never saved
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationRecord>, StoreError>;

    /// Replace the stored transcript and metadata
    async fn save(
        &self,
        conversation_id: &str,
        transcript: &Transcript,
        metadata: &Map<String, Value>,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store; contents are lost on exit
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: Mutex<HashMap<String, ConversationRecord>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.lock().is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationRecord>, StoreError> {
        Ok(self.conversations.lock().get(conversation_id).cloned())
    }

    async fn save(
        &self,
        conversation_id: &str,
        transcript: &Transcript,
        metadata: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.conversations.lock().insert(
            conversation_id.to_string(),
            ConversationRecord {
                transcript: transcript.clone(),
                metadata: metadata.clone(),
                updated_at: Some(Utc::now()),
            },
        );
        Ok(())
    }
}

// ============================================================================
// SQLite store
// ============================================================================

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        transcript TEXT NOT NULL,
        metadata TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at);
"#;

/// SQLite-backed store. Queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteConversationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConversationStore {
    /// Open (or create) the database at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Task(format!("cannot create {}: {}", parent.display(), e)))?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationRecord>, StoreError> {
        let id = conversation_id.to_string();
        let row = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT transcript, metadata, updated_at FROM conversations WHERE id = ?1",
                        params![id],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                            ))
                        },
                    )
                    .optional()?)
            })
            .await?;

        let Some((transcript, metadata, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(ConversationRecord {
            transcript: serde_json::from_str(&transcript)?,
            metadata: serde_json::from_str(&metadata)?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        }))
    }

    async fn save(
        &self,
        conversation_id: &str,
        transcript: &Transcript,
        metadata: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let id = conversation_id.to_string();
        let transcript = serde_json::to_string(transcript)?;
        let metadata = serde_json::to_string(metadata)?;
        let now = Utc::now().to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                r#"INSERT INTO conversations (id, transcript, metadata, created_at, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?4)
                   ON CONFLICT(id) DO UPDATE SET
                       transcript = excluded.transcript,
                       metadata = excluded.metadata,
                       updated_at = excluded.updated_at"#,
                params![id, transcript, metadata, now],
            )?;
            Ok(())
        })
        .await
    }
}
