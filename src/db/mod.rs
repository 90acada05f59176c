//! SQLite persistence for drawings.
//!
//! All connection access happens on one dedicated worker thread; async
//! callers submit closures over a channel and await the reply on a oneshot.
//! This keeps rusqlite's `!Sync` connection off the tokio workers without a
//! mutex around every statement.

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{DrawingRecord, NewDrawing};
use migrations::run_migrations;

/// Key-ordered append-only store for finished drawings. `append` returns the
/// store-assigned id; `list` is newest first.
pub trait DrawingStore: Send + Sync + 'static {
    fn append(&self, drawing: NewDrawing) -> impl Future<Output = Result<i64>> + Send;
    fn list(&self) -> impl Future<Output = Result<Vec<DrawingRecord>>> + Send;
    fn get(&self, id: i64) -> impl Future<Output = Result<Option<DrawingRecord>>> + Send;
}

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
            .name("airsketch-db".into())
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
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
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
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_drawing(&self, drawing: NewDrawing) -> Result<i64> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO drawings (image_png, analysis, created_at) VALUES (?1, ?2, ?3)",
                params![
                    drawing.image_png,
                    drawing.analysis,
                    drawing.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert drawing")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn list_drawings(&self) -> Result<Vec<DrawingRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, image_png, analysis, created_at
                 FROM drawings
                 ORDER BY created_at DESC, id DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut drawings = Vec::new();
            while let Some(row) = rows.next()? {
                drawings.push(row_to_record(row)?);
            }
            Ok(drawings)
        })
        .await
    }

    pub async fn get_drawing(&self, id: i64) -> Result<Option<DrawingRecord>> {
        self.execute(move |conn| {
            conn.query_row(
                "SELECT id, image_png, analysis, created_at FROM drawings WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .with_context(|| format!("failed to load drawing {id}"))?
            .map(|(id, image_png, analysis, created_at)| {
                Ok(DrawingRecord {
                    id,
                    image_png,
                    analysis,
                    created_at: parse_datetime(&created_at)?,
                })
            })
            .transpose()
        })
        .await
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<DrawingRecord> {
    Ok(DrawingRecord {
        id: row.get(0)?,
        image_png: row.get(1)?,
        analysis: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?)?,
    })
}

impl DrawingStore for Database {
    async fn append(&self, drawing: NewDrawing) -> Result<i64> {
        self.insert_drawing(drawing).await
    }

    async fn list(&self) -> Result<Vec<DrawingRecord>> {
        self.list_drawings().await
    }

    async fn get(&self, id: i64) -> Result<Option<DrawingRecord>> {
        self.get_drawing(id).await
    }
}
