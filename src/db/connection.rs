use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreRequest {
    Run(StoreTask),
    Close,
}

struct StoreThread {
    requests: mpsc::Sender<StoreRequest>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreThread {
    fn drop(&mut self) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = handle.take() {
            if let Err(err) = self.requests.send(StoreRequest::Close) {
                error!("Capture store thread already gone: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Capture store thread panicked: {join_err:?}");
            }
        }
    }
}

/// Handle to the capture database.
///
/// A single worker thread owns the SQLite connection and runs submitted
/// tasks one at a time, so every mutation is serialized against the others.
#[derive(Clone)]
pub struct Database {
    thread: Arc<StoreThread>,
    db_path: Arc<PathBuf>,
}

/// Open the store file and bring it to the current schema.
fn open_store(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open capture store {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Capture store stays in rollback journal mode: {err}");
    }
    // A capture or sync mark must be on disk once its call returns.
    conn.pragma_update(None, "synchronous", "FULL")
        .context("failed to enable synchronous commits")?;

    run_migrations(&mut conn).context("failed to upgrade capture store")?;
    Ok(conn)
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create capture store directory {}", parent.display())
            })?;
        }

        let (request_tx, request_rx) = mpsc::channel::<StoreRequest>();
        let (opened_tx, opened_rx) = mpsc::channel::<Result<()>>();
        let thread_path = db_path.clone();

        let handle = thread::Builder::new()
            .name("capture-store".into())
            .spawn(move || {
                let mut conn = match open_store(&thread_path) {
                    Ok(conn) => {
                        if opened_tx.send(Ok(())).is_err() {
                            return;
                        }
                        conn
                    }
                    Err(err) => {
                        let _ = opened_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(StoreRequest::Run(task)) = request_rx.recv() {
                    task(&mut conn);
                }

                info!("Capture store closed");
            })
            .context("failed to start capture store thread")?;

        opened_rx
            .recv()
            .context("capture store thread stopped while opening")??;

        info!("Capture store ready at {}", db_path.display());

        Ok(Self {
            thread: Arc::new(StoreThread {
                requests: request_tx,
                handle: Mutex::new(Some(handle)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Run `task` on the database thread and wait for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let request = StoreRequest::Run(Box::new(move |conn| {
            // The caller may have been cancelled; its result is discarded.
            let _ = reply_tx.send(task(conn));
        }));

        self.thread
            .requests
            .send(request)
            .map_err(|_| anyhow!("capture store is closed"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("capture store thread stopped before replying"))?
    }
}
