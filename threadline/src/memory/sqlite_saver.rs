//! SQLite-backed checkpointer. Persistent across process restarts.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::memory::checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource,
};
use crate::memory::checkpointer::{window, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::serializer::Serializer;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id TEXT NOT NULL,
    checkpoint_ns TEXT NOT NULL,
    checkpoint_id TEXT NOT NULL,
    parent_checkpoint_id TEXT,
    payload BLOB NOT NULL,
    metadata_source TEXT NOT NULL,
    metadata_step INTEGER NOT NULL,
    metadata_created_at INTEGER NOT NULL,
    metadata_writes TEXT,
    PRIMARY KEY (thread_id, checkpoint_ns, checkpoint_id)
)
"#;

const SELECT_COLUMNS: &str = "checkpoint_id, parent_checkpoint_id, payload, metadata_source, \
     metadata_step, metadata_created_at, metadata_writes";

fn storage(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Raw row before the payload is deserialized.
struct Row {
    checkpoint_id: String,
    payload: Vec<u8>,
    metadata: CheckpointMetadata,
}

type RawRow = (String, Option<String>, Vec<u8>, String, i64, i64, Option<String>);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_row(
    (checkpoint_id, parent_id, payload, source, step, created_at, writes): RawRow,
) -> Result<Row, CheckpointError> {
    let writes = writes
        .map(|w| serde_json::from_str(&w))
        .transpose()
        .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
    Ok(Row {
        checkpoint_id,
        payload,
        metadata: CheckpointMetadata {
            source: CheckpointSource::parse(&source),
            step,
            created_at: millis_to_datetime(created_at),
            parent_id,
            writes,
        },
    })
}

/// SQLite-backed checkpointer. Key: (thread_id, checkpoint_ns, checkpoint_id).
///
/// Holds one connection for its lifetime, so `":memory:"` behaves like a
/// private in-memory database. Blocking calls run on `spawn_blocking`.
///
/// **Interaction**: Selected by the CLI `--db PATH` flag as the backend of
/// `ConversationStore`.
pub struct SqliteSaver<S> {
    conn: Arc<Mutex<Connection>>,
    serializer: Arc<dyn Serializer<S>>,
}

impl<S> SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the database at `path` and ensures the table exists.
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer<S>>,
    ) -> Result<Self, CheckpointError> {
        let conn = Connection::open(path.as_ref()).map_err(storage)?;
        conn.execute(SCHEMA, []).map_err(storage)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            serializer,
        })
    }

    fn thread_id_required(config: &RunnableConfig) -> Result<String, CheckpointError> {
        config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, CheckpointError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CheckpointError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|e| storage(format!("connection lock: {}", e)))?;
            f(&guard)
        })
        .await
        .map_err(storage)?
    }
}

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let payload = self.serializer.serialize(&checkpoint.channel_values)?;
        let meta = &checkpoint.metadata;
        let writes = meta
            .writes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let source = meta.source.as_str();
        let step = meta.step;
        let created_at = meta.created_at.timestamp_millis();
        let parent_id = meta.parent_id.clone();
        let id = checkpoint.id.clone();

        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO checkpoints
                (thread_id, checkpoint_ns, checkpoint_id, parent_checkpoint_id, payload,
                 metadata_source, metadata_step, metadata_created_at, metadata_writes)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    thread_id,
                    checkpoint_ns,
                    id,
                    parent_id,
                    payload,
                    source,
                    step,
                    created_at,
                    writes,
                ],
            )
            .map_err(storage)?;
            Ok(id)
        })
        .await
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let want_id = config.checkpoint_id.clone();

        let raw = self
            .with_conn(move |conn| {
                let found = match want_id {
                    Some(cid) => conn
                        .query_row(
                            &format!(
                                "SELECT {} FROM checkpoints \
                                 WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?3",
                                SELECT_COLUMNS
                            ),
                            params![thread_id, checkpoint_ns, cid],
                            read_row,
                        )
                        .optional(),
                    None => conn
                        .query_row(
                            &format!(
                                "SELECT {} FROM checkpoints \
                                 WHERE thread_id = ?1 AND checkpoint_ns = ?2 \
                                 ORDER BY metadata_step DESC, rowid DESC LIMIT 1",
                                SELECT_COLUMNS
                            ),
                            params![thread_id, checkpoint_ns],
                            read_row,
                        )
                        .optional(),
                };
                found.map_err(storage)
            })
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let row = into_row(raw)?;
        let channel_values = self.serializer.deserialize(&row.payload)?;
        let checkpoint = Checkpoint {
            id: row.checkpoint_id,
            channel_values,
            metadata: row.metadata.clone(),
        };
        Ok(Some((checkpoint, row.metadata)))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();

        let items = self
            .with_conn(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2 \
                         ORDER BY metadata_step ASC, rowid ASC",
                        SELECT_COLUMNS
                    ))
                    .map_err(storage)?;
                let rows = stmt
                    .query_map(params![thread_id, checkpoint_ns], read_row)
                    .map_err(storage)?;
                let mut items = Vec::new();
                for raw in rows {
                    let row = into_row(raw.map_err(storage)?)?;
                    items.push(CheckpointListItem {
                        checkpoint_id: row.checkpoint_id,
                        metadata: row.metadata,
                    });
                }
                Ok(items)
            })
            .await?;
        Ok(window(items, limit, before))
    }
}
