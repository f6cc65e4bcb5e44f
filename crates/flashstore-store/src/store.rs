// ABOUTME: Public handle for the durable store: queued execute/query calls over the writer channel.
// ABOUTME: All mutating paths are serialized through the single queue; there is no bypass entry point.

use std::path::PathBuf;

use flashstore_engine::Row;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::bootstrap::Bootstrap;
use crate::error::StoreError;
use crate::lifecycle::Lifecycle;
use crate::snapshot::SnapshotStore;
use crate::writer::{Op, Writer};

/// Queue depth for pending operations. Submissions past this bound apply
/// backpressure rather than growing without limit.
const QUEUE_DEPTH: usize = 64;

/// Store configuration: the backing file path and the retry bound.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the snapshot file. The parent directory is created if absent.
    pub snapshot_path: PathBuf,
    /// Additional attempts after a recoverable fault (total attempts =
    /// `max_retries + 1`).
    pub max_retries: u32,
}

impl StoreConfig {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            max_retries: 2,
        }
    }
}

/// Handle to a running store. Cloneable; all clones feed the same queue.
///
/// Each store owns its engine and snapshot file, so independent stores can
/// coexist in one process (and in tests). Dropping every handle closes the
/// queue; the writer settles already-queued operations before exiting.
#[derive(Clone)]
pub struct Store {
    op_tx: mpsc::Sender<Op>,
}

impl Store {
    /// Start the store: spawn the writer thread, run engine initialization
    /// on it (snapshot load or empty engine + bootstrap), and wait for the
    /// result. Must complete before any other call; repeating it on every
    /// process start is safe.
    pub async fn open(config: StoreConfig, bootstrap: Bootstrap) -> Result<Self, StoreError> {
        let (op_tx, op_rx) = mpsc::channel(QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("flashstore-writer".to_string())
            .spawn(move || {
                let snapshots = match SnapshotStore::new(config.snapshot_path) {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(StoreError::Init(e.into())));
                        return;
                    }
                };
                let lifecycle = Lifecycle::new(snapshots, bootstrap);
                let engine = match lifecycle.init() {
                    Ok(engine) => engine,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                Writer {
                    engine,
                    lifecycle,
                    max_retries: config.max_retries,
                    batch_pending: false,
                }
                .run(op_rx);
            })?;

        ready_rx.await.map_err(|_| StoreError::ChannelClosed)??;
        Ok(Self { op_tx })
    }

    /// Queued, durable mutating call: executes the statement and persists a
    /// snapshot before resolving. Durable on success.
    pub async fn execute(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(
            Op::Execute {
                sql: sql.into(),
                params,
                reply,
            },
            rx,
        )
        .await
    }

    /// Queued mutating call that skips the per-statement snapshot write.
    /// Not durable until [`Store::commit`] runs.
    pub async fn execute_batch(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(
            Op::ExecuteBatch {
                sql: sql.into(),
                params,
                reply,
            },
            rx,
        )
        .await
    }

    /// Flush exactly one snapshot write for a preceding batch sequence.
    pub async fn commit(&self) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Op::Commit { reply }, rx).await
    }

    /// Queued read returning the first row, or None.
    pub async fn query_one(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Option<Row>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(
            Op::QueryOne {
                sql: sql.into(),
                params,
                reply,
            },
            rx,
        )
        .await
    }

    /// Queued read returning all rows, or an empty Vec.
    pub async fn query_all(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Vec<Row>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(
            Op::QueryAll {
                sql: sql.into(),
                params,
                reply,
            },
            rx,
        )
        .await
    }

    /// Synchronous mutating call for non-async callers. Blocks on the same
    /// queue as [`Store::execute`], so it serializes with every other
    /// operation instead of racing them.
    ///
    /// Must not be called from an async context; the underlying blocking
    /// send panics inside a tokio runtime. Use [`Store::execute`] there.
    pub fn execute_sync(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.op_tx
            .blocking_send(Op::Execute {
                sql: sql.into(),
                params,
                reply,
            })
            .map_err(|_| StoreError::ChannelClosed)?;
        rx.blocking_recv().map_err(|_| StoreError::ChannelClosed)?
    }

    async fn send<T>(
        &self,
        op: Op,
        rx: oneshot::Receiver<Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        self.op_tx
            .send(op)
            .await
            .map_err(|_| StoreError::ChannelClosed)?;
        rx.await.map_err(|_| StoreError::ChannelClosed)?
    }
}
