use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mnemo_core::{Observation, StateStore, ThreadSnapshot};
use mnemo_telemetry::Paths;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// All threads in one database. `save` replaces a thread's rows in a single
/// transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening {}", db_path.display()))?;
        Self::from_connection(conn)
    }

    pub fn from_paths(paths: &Paths) -> Result<Self> {
        Self::new(&paths.sqlite_file())
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS threads (
                thread_id TEXT PRIMARY KEY,
                messages_processed INTEGER NOT NULL,
                reflection_count INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS observations (
                thread_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                source_message_count INTEGER NOT NULL,
                reflection_generation INTEGER NOT NULL,
                PRIMARY KEY (thread_id, position)
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_to_observation(thread_id: &str, row: ObservationRow) -> Result<Observation> {
        let (content, created_at, source_message_count, reflection_generation) = row;
        let created_at: DateTime<Utc> = created_at
            .parse()
            .with_context(|| format!("bad created_at '{}'", created_at))?;
        Ok(Observation::restore(
            thread_id,
            content,
            created_at,
            usize::try_from(source_message_count)?,
            reflection_generation,
        ))
    }
}

type ObservationRow = (String, String, i64, u32);

impl StateStore for SqliteStore {
    fn load(&self, thread_id: &str) -> Result<Option<ThreadSnapshot>> {
        let conn = self.conn();

        let counters: Option<(i64, i64)> = conn
            .query_row(
                "SELECT messages_processed, reflection_count FROM threads WHERE thread_id = ?",
                params![thread_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((messages_processed, reflection_count)) = counters else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT content, created_at, source_message_count, reflection_generation
             FROM observations WHERE thread_id = ? ORDER BY position",
        )?;
        let rows = stmt.query_map(params![thread_id], |row| -> rusqlite::Result<ObservationRow> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;

        let mut observations = Vec::new();
        for row in rows {
            observations.push(Self::row_to_observation(thread_id, row?)?);
        }

        Ok(Some(ThreadSnapshot {
            thread_id: thread_id.to_string(),
            observations,
            messages_processed: usize::try_from(messages_processed)?,
            reflection_count: usize::try_from(reflection_count)?,
        }))
    }

    fn save(&self, snapshot: &ThreadSnapshot) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO threads (thread_id, messages_processed, reflection_count, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(thread_id) DO UPDATE SET
                messages_processed = excluded.messages_processed,
                reflection_count = excluded.reflection_count,
                updated_at = excluded.updated_at",
            params![
                snapshot.thread_id,
                i64::try_from(snapshot.messages_processed)?,
                i64::try_from(snapshot.reflection_count)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.execute(
            "DELETE FROM observations WHERE thread_id = ?",
            params![snapshot.thread_id],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO observations VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, obs) in snapshot.observations.iter().enumerate() {
                insert.execute(params![
                    snapshot.thread_id,
                    i64::try_from(position)?,
                    obs.content(),
                    obs.created_at().to_rfc3339(),
                    i64::try_from(obs.source_message_count())?,
                    obs.reflection_generation(),
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            thread_id = %snapshot.thread_id,
            observations = snapshot.observations.len(),
            "thread saved"
        );
        Ok(())
    }

    fn thread_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT thread_id FROM threads ORDER BY thread_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<String>, _>>().map_err(Into::into)
    }
}
