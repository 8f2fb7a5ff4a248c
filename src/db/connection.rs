use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// `None` asks the writer thread to stop.
type Mailbox = mpsc::Sender<Option<Job>>;

struct Writer {
    mailbox: Mailbox,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Writer {
    fn drop(&mut self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };
        if self.mailbox.send(None).is_err() {
            error!("Record store thread already gone at shutdown");
        }
        if let Err(join_err) = handle.join() {
            error!("Record store thread panicked: {join_err:?}");
        }
    }
}

fn open_store(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open record store {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }
    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn writer_loop(mut conn: Connection, jobs: mpsc::Receiver<Option<Job>>) {
    while let Ok(Some(job)) = jobs.recv() {
        job(&mut conn);
    }
    info!("Record store thread stopped");
}

/// Session record store. A single thread owns the SQLite connection, so
/// writes land in submission order; clones share that thread.
#[derive(Clone)]
pub struct Database {
    writer: Arc<Writer>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (mailbox, jobs) = mpsc::channel::<Option<Job>>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread = thread::Builder::new()
            .name("respiro-db".into())
            .spawn(move || match open_store(&db_path) {
                Ok(conn) => {
                    info!("Record store ready at {}", db_path.display());
                    if ready_tx.send(Ok(())).is_ok() {
                        writer_loop(conn, jobs);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("record store thread exited during startup")??;

        Ok(Self {
            writer: Arc::new(Writer {
                mailbox,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Run `job` on the store thread and await what it returns.
    pub async fn execute<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            let _ = reply_tx.send(job(conn));
        });

        self.writer
            .mailbox
            .send(Some(job))
            .map_err(|_| anyhow!("record store thread is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("record store dropped the request"))?
    }
}
