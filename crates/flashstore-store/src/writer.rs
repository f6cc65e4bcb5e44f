// ABOUTME: The single-writer loop that owns the engine and drains queued operations in FIFO order.
// ABOUTME: Runs on a dedicated thread; applies the retry policy and persists snapshots after mutations.

use flashstore_engine::{Engine, Row};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::StoreError;
use crate::lifecycle::Lifecycle;
use crate::retry;

/// One queued operation with its typed reply channel. Created when a caller
/// submits work; consumed exactly once by the writer loop.
pub(crate) enum Op {
    Execute {
        sql: String,
        params: Vec<Value>,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    ExecuteBatch {
        sql: String,
        params: Vec<Value>,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Commit {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    QueryOne {
        sql: String,
        params: Vec<Value>,
        reply: oneshot::Sender<Result<Option<Row>, StoreError>>,
    },
    QueryAll {
        sql: String,
        params: Vec<Value>,
        reply: oneshot::Sender<Result<Vec<Row>, StoreError>>,
    },
}

/// Owns the live engine and processes operations one at a time.
///
/// Ordering comes for free: the mpsc channel is FIFO and this loop is the
/// only consumer, so no two operations ever overlap and submission order is
/// execution order. Replies go through `oneshot::Sender::send`, which never
/// runs caller code on this thread, so a buggy caller cannot stall the loop.
pub(crate) struct Writer {
    pub(crate) engine: Engine,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) max_retries: u32,
    pub(crate) batch_pending: bool,
}

impl Writer {
    /// Drain the queue until every sender is dropped, then exit.
    pub(crate) fn run(mut self, mut op_rx: mpsc::Receiver<Op>) {
        while let Some(op) = op_rx.blocking_recv() {
            match op {
                Op::Execute { sql, params, reply } => {
                    let result = self
                        .with_recovery(|engine| engine.execute(&sql, &params))
                        .map(|_| ());
                    if result.is_ok() {
                        self.persist_best_effort();
                    }
                    let _ = reply.send(result);
                }
                Op::ExecuteBatch { sql, params, reply } => {
                    let result = self
                        .with_recovery(|engine| engine.execute(&sql, &params))
                        .map(|_| ());
                    if result.is_ok() {
                        self.batch_pending = true;
                    }
                    let _ = reply.send(result);
                }
                Op::Commit { reply } => {
                    self.persist_best_effort();
                    self.batch_pending = false;
                    let _ = reply.send(Ok(()));
                }
                Op::QueryOne { sql, params, reply } => {
                    let result = self.with_recovery(|engine| engine.query_one(&sql, &params));
                    let _ = reply.send(result);
                }
                Op::QueryAll { sql, params, reply } => {
                    let result = self.with_recovery(|engine| engine.query_all(&sql, &params));
                    let _ = reply.send(result);
                }
            }
        }

        if self.batch_pending {
            tracing::warn!("store dropped with uncommitted batch mutations; they were never persisted");
        }
    }

    fn with_recovery<T>(
        &mut self,
        op: impl Fn(&Engine) -> Result<T, flashstore_engine::EngineError>,
    ) -> Result<T, StoreError> {
        retry::run_with_recovery(&mut self.engine, &self.lifecycle, self.max_retries, op)
    }

    /// Persist the snapshot, logging and swallowing failures. The in-memory
    /// dataset stays correct; the next successful persist restores
    /// durability.
    fn persist_best_effort(&self) {
        if let Err(e) = self.lifecycle.snapshots().persist(&self.engine) {
            tracing::error!(
                path = %self.lifecycle.snapshots().path().display(),
                error = %e,
                "snapshot persist failed; durability degraded until next successful persist"
            );
        }
    }
}
