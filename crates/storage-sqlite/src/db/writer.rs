use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::debug;
use std::any::Any;
use std::sync::mpsc;
use std::thread;
use ledgerfolio_core::errors::{DatabaseError, Error, Result};

type Job = Box<dyn FnOnce(&mut SqliteConnection) -> Result<Box<dyn Any + Send>> + Send>;
type Reply = mpsc::SyncSender<Result<Box<dyn Any + Send>>>;

/// Handle for sending jobs to the single writer thread.
///
/// Every job runs inside its own `BEGIN IMMEDIATE` transaction on one
/// dedicated connection, so writes never interleave and a failing job rolls
/// back completely.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(Job, Reply)>,
}

fn writer_stopped() -> Error {
    Error::Database(DatabaseError::ConnectionFailed(
        "database writer has stopped".to_string(),
    ))
}

impl WriteHandle {
    /// Runs `job` on the writer connection and blocks until it commits or rolls back.
    pub fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = mpsc::sync_channel(1);
        let boxed_job: Job = Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>));
        self.tx
            .send((boxed_job, ret_tx))
            .map_err(|_| writer_stopped())?;

        let boxed = ret_rx.recv().map_err(|_| writer_stopped())??;
        boxed.downcast::<T>().map(|value| *value).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "writer returned a result of an unexpected type".to_string(),
            ))
        })
    }
}

/// Spawns the writer thread. It owns one pooled connection for its whole
/// lifetime and exits once every `WriteHandle` has been dropped.
pub fn spawn_writer(pool: DbPool) -> Result<WriteHandle> {
    let mut conn = pool.get().map_err(StorageError::from)?;
    let (tx, rx) = mpsc::channel::<(Job, Reply)>();

    thread::Builder::new()
        .name("ledgerfolio-db-writer".to_string())
        .spawn(move || {
            while let Ok((job, reply_tx)) = rx.recv() {
                let result: Result<Box<dyn Any + Send>> = conn
                    .immediate_transaction::<_, StorageError, _>(|c| {
                        job(c).map_err(StorageError::from)
                    })
                    .map_err(Error::from);
                // The caller may have given up waiting; nothing to do then.
                let _ = reply_tx.send(result);
            }
            debug!("Database writer stopped");
        })
        .map_err(|e| Error::Database(DatabaseError::Internal(e.to_string())))?;

    Ok(WriteHandle { tx })
}
