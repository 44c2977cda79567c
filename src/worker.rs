//! The queued statement worker: a dedicated thread owning one pooled
//! connection, draining submitted statements on a fixed tick.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use deadpool::managed::ObjectId;
use deadpool_sqlite::Object;
use deadpool_sqlite::rusqlite::{self, ToSql};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::error::OrmError;
use crate::results::ResultSet;
use crate::sqlite::{build_result_set, to_sqlite_params};
use crate::types::ParameterizedStatement;

/// Interval between queue drains when no task is waiting.
pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

type RowsCallback = Box<dyn FnOnce(Option<ResultSet>) + Send>;
type CountCallback = Box<dyn FnOnce(i64) + Send>;

/// A statement queued for execution, with optional completion callbacks.
///
/// Statements returning rows invoke the rows callback with the result set
/// and the count callback with `-1`. Statements returning no rows invoke the
/// count callback with the affected-row count and the rows callback with
/// `None`. A failed statement invokes the rows callback with `None` and the
/// count callback with `-1`.
pub struct PendingTask {
    statement: ParameterizedStatement,
    on_rows: Option<RowsCallback>,
    on_count: Option<CountCallback>,
}

impl PendingTask {
    #[must_use]
    pub fn new(statement: ParameterizedStatement) -> Self {
        PendingTask {
            statement,
            on_rows: None,
            on_count: None,
        }
    }

    #[must_use]
    pub fn on_rows(mut self, callback: impl FnOnce(Option<ResultSet>) + Send + 'static) -> Self {
        self.on_rows = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_count(mut self, callback: impl FnOnce(i64) + Send + 'static) -> Self {
        self.on_count = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask")
            .field("sql", &self.statement.sql)
            .field("params", &self.statement.params.len())
            .finish()
    }
}

enum Command {
    Task(PendingTask),
    Shutdown,
}

/// Handle to the worker thread. Cloneable; the thread shuts down when the
/// last handle drops.
#[derive(Clone)]
pub struct StatementWorker {
    inner: Arc<WorkerInner>,
}

struct WorkerInner {
    sender: Sender<Command>,
    object_id: ObjectId,
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

impl StatementWorker {
    /// Spawn the worker thread over a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Connection` if the thread cannot be spawned.
    pub fn spawn(object: Object, tick: Duration) -> Result<Self, OrmError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let object_id = Object::id(&object);
        let handle = Handle::try_current().ok();
        thread::Builder::new()
            .name(format!("orm-worker-{object_id}"))
            .spawn(move || {
                let runtime_guard = handle.as_ref().map(Handle::enter);
                run_worker(&object, &receiver, tick);
                drop(runtime_guard);
            })
            .map_err(|err| {
                OrmError::Connection(format!("failed to spawn statement worker thread: {err}"))
            })?;

        Ok(StatementWorker {
            inner: Arc::new(WorkerInner { sender, object_id }),
        })
    }

    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.inner.object_id
    }

    /// Queue a task without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Connection` when the worker has shut down.
    pub fn enqueue(&self, task: PendingTask) -> Result<(), OrmError> {
        self.inner
            .sender
            .send(Command::Task(task))
            .map_err(|_| OrmError::Connection("statement worker closed".into()))
    }

    /// Queue a statement and await its result set.
    pub async fn execute_query(
        &self,
        statement: ParameterizedStatement,
    ) -> Result<ResultSet, OrmError> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(PendingTask::new(statement).on_rows(move |result| {
            let _ = tx.send(result);
        }))?;
        match rx.await {
            Ok(Some(result_set)) => Ok(result_set),
            Ok(None) => Err(OrmError::Execution(
                "statement failed on the worker thread".into(),
            )),
            Err(_) => Err(OrmError::Connection(
                "statement worker dropped while executing query".into(),
            )),
        }
    }

    /// Queue a statement and await its affected-row count.
    pub async fn execute_update(
        &self,
        statement: ParameterizedStatement,
    ) -> Result<usize, OrmError> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(PendingTask::new(statement).on_count(move |count| {
            let _ = tx.send(count);
        }))?;
        match rx.await {
            Ok(count) if count >= 0 => Ok(count as usize),
            Ok(_) => Err(OrmError::Execution(
                "statement failed on the worker thread".into(),
            )),
            Err(_) => Err(OrmError::Connection(
                "statement worker dropped while executing update".into(),
            )),
        }
    }

    /// Ask the worker to stop after draining what is already queued.
    pub fn shutdown(&self) {
        let _ = self.inner.sender.send(Command::Shutdown);
    }
}

impl fmt::Debug for StatementWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementWorker")
            .field("object_id", &self.inner.object_id)
            .finish()
    }
}

fn run_worker(object: &Object, receiver: &Receiver<Command>, tick: Duration) {
    let mut conn_guard = match object.lock() {
        Ok(guard) => guard,
        Err(err) => {
            error!("connection mutex poisoned: {err}");
            return;
        }
    };

    loop {
        match receiver.recv_timeout(tick) {
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Command::Task(task)) => {
                run_task(&mut conn_guard, task);
                // Drain everything already queued before sleeping again. A
                // shutdown seen mid-drain still lets queued tasks finish.
                let mut shutdown = false;
                loop {
                    match receiver.try_recv() {
                        Ok(Command::Task(task)) => run_task(&mut conn_guard, task),
                        Ok(Command::Shutdown) => shutdown = true,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            shutdown = true;
                            break;
                        }
                    }
                }
                if shutdown {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    debug!("statement worker stopped");
}

enum TaskOutcome {
    Rows(ResultSet),
    Count(usize),
}

/// Run one task. Failures are reported through the callbacks and never stop
/// the worker.
fn run_task(conn: &mut rusqlite::Connection, task: PendingTask) {
    let PendingTask {
        statement,
        on_rows,
        on_count,
    } = task;
    let params = to_sqlite_params(&statement.params);

    let outcome = (|| -> Result<TaskOutcome, OrmError> {
        let mut stmt = conn.prepare(&statement.sql)?;
        if stmt.column_count() > 0 {
            Ok(TaskOutcome::Rows(build_result_set(&mut stmt, &params)?))
        } else {
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
            Ok(TaskOutcome::Count(stmt.execute(&param_refs[..])?))
        }
    })();

    match outcome {
        Ok(TaskOutcome::Rows(result_set)) => {
            if let Some(callback) = on_count {
                callback(-1);
            }
            if let Some(callback) = on_rows {
                callback(Some(result_set));
            }
        }
        Ok(TaskOutcome::Count(count)) => {
            if let Some(callback) = on_rows {
                callback(None);
            }
            if let Some(callback) = on_count {
                callback(count as i64);
            }
        }
        Err(err) => {
            error!(sql = %statement.sql, "statement failed on worker: {err}");
            if let Some(callback) = on_rows {
                callback(None);
            }
            if let Some(callback) = on_count {
                callback(-1);
            }
        }
    }
}
