use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

mod migrations;

use migrations::run_migrations;

use crate::{flags::KeyValueStore, models::ContactPayload};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

/// A contact request waiting in the outbox for the relay to pick up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutboxMessage {
    pub id: String,
    pub payload: ContactPayload,
    pub created_at: DateTime<Utc>,
}

impl OutboxMessage {
    pub fn new(payload: ContactPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("discovery-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Same as [`Database::execute`] for callers that cannot await, such as
    /// flag reads inside an event handler. The work still runs on the DB thread.
    pub fn execute_blocking<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .recv()
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_outbox_message(&self, message: &OutboxMessage) -> Result<()> {
        let record = message.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO outbox (id, contact_value, message_text, submitted_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.payload.contact_value,
                    record.payload.message_text,
                    record.payload.submitted_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert outbox message")?;
            Ok(())
        })
        .await
    }

    pub async fn list_outbox_messages(&self) -> Result<Vec<OutboxMessage>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, contact_value, message_text, submitted_at, created_at
                 FROM outbox
                 ORDER BY created_at ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut messages = Vec::new();
            while let Some(row) = rows.next()? {
                messages.push(OutboxMessage {
                    id: row.get(0)?,
                    payload: ContactPayload {
                        contact_value: row.get(1)?,
                        message_text: row.get(2)?,
                        submitted_at: parse_datetime(&row.get::<_, String>(3)?)?,
                    },
                    created_at: parse_datetime(&row.get::<_, String>(4)?)?,
                });
            }

            Ok(messages)
        })
        .await
    }

    pub async fn count_outbox_messages(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))?;
            u64::try_from(count).map_err(|_| anyhow!("outbox count {count} is negative"))
        })
        .await
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute_blocking(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read key {key}"))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute_blocking(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key {key}"))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("discovery.sqlite3")).unwrap();
        (dir, db)
    }

    #[test]
    fn key_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("discovery.sqlite3");

        {
            let db = Database::new(path.clone()).unwrap();
            assert_eq!(db.get("hasInteractedProfile").unwrap(), None);
            db.set("hasInteractedProfile", "true").unwrap();
        }

        let reopened = Database::new(path).unwrap();
        assert_eq!(
            reopened.get("hasInteractedProfile").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn set_overwrites_existing_value() {
        let (_dir, db) = temp_db();
        db.set("theme", "dark").unwrap();
        db.set("theme", "light").unwrap();
        assert_eq!(db.get("theme").unwrap().as_deref(), Some("light"));
    }

    #[tokio::test]
    async fn outbox_round_trips_messages_in_order() {
        let (_dir, db) = temp_db();
        let first = OutboxMessage::new(ContactPayload::new(
            "user@example.com".into(),
            "Hello".into(),
        ));
        db.insert_outbox_message(&first).await.unwrap();

        let mut second = OutboxMessage::new(ContactPayload::new(
            "05551234567".into(),
            "Call me".into(),
        ));
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        db.insert_outbox_message(&second).await.unwrap();

        let messages = db.list_outbox_messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, first.id);
        assert_eq!(messages[0].payload.message_text, "Hello");
        assert_eq!(messages[1].payload.contact_value, "05551234567");
        assert_eq!(db.count_outbox_messages().await.unwrap(), 2);
    }
}
