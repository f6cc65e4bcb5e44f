// ABOUTME: Engine lifecycle manager: cold start (load-or-initialize), schema bootstrap, hot reload.
// ABOUTME: Owns the snapshot store and bootstrap definition; exactly one engine is live at a time.

use std::path::PathBuf;

use flashstore_engine::{Engine, EngineError};
use thiserror::Error;

use crate::bootstrap::{Bootstrap, ColumnMigration, Seed};
use crate::snapshot::{SnapshotError, SnapshotStore};

/// Errors that can occur during engine lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no snapshot at {}", .0.display())]
    SnapshotMissing(PathBuf),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Owns the snapshot store and bootstrap definition, and produces engine
/// instances: a bootstrapped one at cold start, and fresh replacements
/// during recovery. A returned engine fully supersedes any previous one;
/// the caller drops the old instance outright.
pub struct Lifecycle {
    snapshots: SnapshotStore,
    bootstrap: Bootstrap,
}

impl Lifecycle {
    pub fn new(snapshots: SnapshotStore, bootstrap: Bootstrap) -> Self {
        Self {
            snapshots,
            bootstrap,
        }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Cold start: load the snapshot if one exists, otherwise create an
    /// empty engine; then apply the full bootstrap and persist once.
    /// Safe to call on every process start.
    pub fn init(&self) -> Result<Engine, LifecycleError> {
        let engine = if self.snapshots.exists() {
            tracing::info!(path = %self.snapshots.path().display(), "loading snapshot");
            self.snapshots.load()?
        } else {
            tracing::info!(
                path = %self.snapshots.path().display(),
                "no snapshot found, initializing empty engine"
            );
            Engine::in_memory()?
        };

        self.apply_bootstrap(&engine)?;

        // Bootstrap runs many statements with a single persist at the end,
        // the same O(1) write bound as batch mode.
        if let Err(e) = self.snapshots.persist(&engine) {
            tracing::error!(error = %e, "initial snapshot persist failed; durability degraded");
        }

        Ok(engine)
    }

    /// Re-read the snapshot from disk into a fresh engine that replaces the
    /// live one wholesale. Fails explicitly when the snapshot is missing or
    /// unreadable.
    pub fn reload(&self) -> Result<Engine, LifecycleError> {
        if !self.snapshots.exists() {
            return Err(LifecycleError::SnapshotMissing(
                self.snapshots.path().to_path_buf(),
            ));
        }
        let engine = self.snapshots.load()?;
        tracing::info!("engine reloaded from snapshot");
        Ok(engine)
    }

    fn apply_bootstrap(&self, engine: &Engine) -> Result<(), LifecycleError> {
        for ddl in self.bootstrap.tables() {
            engine.execute(ddl, &[])?;
        }

        for migration in self.bootstrap.migrations() {
            // One broken migration must not block startup for unrelated tables
            if let Err(e) = Self::migrate(engine, migration) {
                tracing::warn!(
                    table = %migration.table,
                    column = %migration.column,
                    error = %e,
                    "column migration failed, continuing"
                );
            }
        }

        for seed in self.bootstrap.seeds() {
            if let Err(e) = Self::apply_seed(engine, seed) {
                tracing::warn!(table = %seed.table, error = %e, "seed skipped");
            }
        }

        Ok(())
    }

    /// Apply a single column migration: introspect the table's columns and
    /// issue the alteration only if the column is absent. Returns true if
    /// the column was added. Missing tables are skipped.
    pub fn migrate(engine: &Engine, migration: &ColumnMigration) -> Result<bool, EngineError> {
        let columns = engine.table_columns(&migration.table)?;
        if columns.is_empty() || columns.iter().any(|c| c == &migration.column) {
            return Ok(false);
        }

        engine.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                migration.table, migration.column, migration.definition
            ),
            &[],
        )?;
        tracing::info!(table = %migration.table, column = %migration.column, "added missing column");
        Ok(true)
    }

    /// Insert a seed row unless a row with the same natural key exists.
    /// Returns true if the row was inserted.
    fn apply_seed(engine: &Engine, seed: &Seed) -> Result<bool, EngineError> {
        let check = format!(
            "SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1",
            seed.table, seed.key_column
        );
        if engine
            .query_one(&check, std::slice::from_ref(&seed.key))?
            .is_some()
        {
            return Ok(false);
        }

        engine.execute(&seed.insert, &seed.params)?;
        Ok(true)
    }
}
