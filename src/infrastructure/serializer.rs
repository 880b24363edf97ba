//! FIFO admission gate over the writer connection.
//!
//! All store mutations funnel through a single dedicated worker thread that
//! owns the writer `Connection`. Units of work are queued on an mpsc channel
//! and run strictly one at a time, each under `BEGIN IMMEDIATE` framing so
//! the write lock is taken before any statement executes. This is what makes
//! "read stock, decide, decrement" atomic with respect to every other
//! submission.

use crate::error::{OrderError, Result};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::mpsc;
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Serializes units of work against the store.
///
/// Created at process start with the writer connection and shut down at exit;
/// callers hold it by reference (or inside an `Arc`) wherever `place_order`
/// and `delete_order` are exposed.
pub struct TxSerializer {
    jobs: mpsc::Sender<Job>,
    worker: thread::JoinHandle<()>,
}

impl TxSerializer {
    /// Moves the writer connection onto a dedicated thread and starts
    /// draining the job queue.
    pub fn spawn(mut conn: Connection) -> Self {
        let (jobs, queue) = mpsc::channel::<Job>();
        let worker = thread::spawn(move || {
            while let Ok(job) = queue.recv() {
                job(&mut conn);
            }
            debug!("writer queue drained, closing connection");
        });
        Self { jobs, worker }
    }

    /// Submits a unit of work and waits for its outcome.
    ///
    /// The work runs inside an immediate-mode transaction: commit on `Ok`,
    /// rollback on `Err` with the original error propagated. Units complete
    /// in submission order; the queue advances regardless of outcome. Once a
    /// unit starts it runs to completion, so a slow unit delays everything
    /// behind it.
    pub async fn submit<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            let result = run_unit(conn, work);
            // The caller may have gone away; the transaction outcome stands
            // either way.
            let _ = reply.send(result);
        });
        self.jobs.send(job).map_err(|_| OrderError::Closed)?;
        outcome.await.map_err(|_| OrderError::Closed)?
    }

    /// Closes the queue and waits for in-flight work to finish.
    pub fn shutdown(self) {
        let Self { jobs, worker } = self;
        drop(jobs);
        if worker.join().is_err() {
            warn!("writer thread panicked during shutdown");
        }
    }
}

fn run_unit<T, F>(conn: &mut Connection, work: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    match work(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            // Best effort: the original error dominates a failed rollback.
            if let Err(rollback_err) = tx.rollback() {
                warn!(%rollback_err, "rollback failed after unit of work error");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn test_serializer() -> TxSerializer {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE log (seq INTEGER NOT NULL)")
            .unwrap();
        TxSerializer::spawn(conn)
    }

    async fn log_entries(serializer: &TxSerializer) -> Vec<i64> {
        serializer
            .submit(|tx| {
                let mut stmt = tx.prepare("SELECT seq FROM log ORDER BY rowid")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok(rows.collect::<rusqlite::Result<Vec<i64>>>()?)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_units_complete_in_submission_order() {
        let serializer = test_serializer();

        let mut handles = Vec::new();
        for seq in 0..20i64 {
            let fut = serializer.submit(move |tx| {
                tx.execute("INSERT INTO log (seq) VALUES (?1)", params![seq])?;
                Ok(())
            });
            handles.push(fut);
        }
        for fut in handles {
            fut.await.unwrap();
        }

        assert_eq!(log_entries(&serializer).await, (0..20).collect::<Vec<_>>());
        serializer.shutdown();
    }

    #[tokio::test]
    async fn test_failed_unit_rolls_back_and_queue_advances() {
        let serializer = test_serializer();

        let failed: Result<()> = serializer
            .submit(|tx| {
                tx.execute("INSERT INTO log (seq) VALUES (1)", [])?;
                Err(OrderError::Validation("rejected".into()))
            })
            .await;
        assert!(matches!(failed, Err(OrderError::Validation(_))));

        // The write above must not be visible, and the queue keeps moving.
        serializer
            .submit(|tx| {
                tx.execute("INSERT INTO log (seq) VALUES (2)", [])?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(log_entries(&serializer).await, vec![2]);
        serializer.shutdown();
    }

    #[tokio::test]
    async fn test_store_error_inside_unit_rolls_back() {
        let serializer = test_serializer();

        let failed: Result<()> = serializer
            .submit(|tx| {
                tx.execute("INSERT INTO log (seq) VALUES (1)", [])?;
                tx.execute("INSERT INTO no_such_table (x) VALUES (1)", [])?;
                Ok(())
            })
            .await;
        assert!(matches!(failed, Err(OrderError::Store(_))));

        assert_eq!(log_entries(&serializer).await, Vec::<i64>::new());
        serializer.shutdown();
    }

    #[tokio::test]
    async fn test_submit_returns_value() {
        let serializer = test_serializer();
        let answer = serializer.submit(|_tx| Ok(41 + 1)).await.unwrap();
        assert_eq!(answer, 42);
        serializer.shutdown();
    }
}
