// ABOUTME: Atomic snapshot persistence for the engine's full database image.
// ABOUTME: Exports via the SQLite online backup API to a temp file, then renames over the snapshot path.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flashstore_engine::Engine;
use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Pages copied per backup step. The source is an in-memory database with
/// no concurrent readers, so there is no reason to pause between steps.
const BACKUP_PAGES_PER_STEP: std::ffi::c_int = 512;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Reads and writes the engine's serialized image at one well-known path.
///
/// The snapshot file is overwritten wholesale on every persist; there is no
/// incremental delta format and no separate log. Durability extends only up
/// to the last successful persist.
#[derive(Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a snapshot store at the given file path.
    /// Creates the parent directory if it does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if a snapshot file exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Export the engine's full dataset and overwrite the snapshot file.
    ///
    /// Writes to a sibling temp file first and renames it into place, so a
    /// crash mid-write never leaves a truncated snapshot behind.
    pub fn persist(&self, engine: &Engine) -> Result<(), SnapshotError> {
        let tmp = self.path.with_extension("tmp");
        // A stale temp file from a crashed persist may not be a valid
        // database; remove it rather than backing up into it.
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }

        {
            let mut dst = Connection::open(&tmp)?;
            let backup = Backup::new(engine.connection(), &mut dst)?;
            backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)?;
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Read the snapshot file into a brand-new in-memory engine.
    pub fn load(&self) -> Result<Engine, SnapshotError> {
        let src = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut conn = Connection::open_in_memory()?;

        {
            let backup = Backup::new(&src, &mut conn)?;
            backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)?;
        }

        Ok(Engine::from_connection(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine_with_row(name: &str) -> Engine {
        let engine = Engine::in_memory().unwrap();
        engine
            .execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .unwrap();
        engine
            .execute("INSERT INTO items (name) VALUES (?1)", &[json!(name)])
            .unwrap();
        engine
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.db")).unwrap();
        assert!(!store.exists());

        store.persist(&engine_with_row("first")).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        let row = loaded
            .query_one("SELECT name FROM items", &[])
            .unwrap()
            .expect("row should survive the round trip");
        assert_eq!(row["name"], json!("first"));
    }

    #[test]
    fn persist_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.db")).unwrap();

        store.persist(&engine_with_row("old")).unwrap();
        store.persist(&engine_with_row("new")).unwrap();

        let loaded = store.load().unwrap();
        let rows = loaded.query_all("SELECT name FROM items", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("new"));
    }

    #[test]
    fn new_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("nested").join("snap.db");

        let store = SnapshotStore::new(&nested).unwrap();
        store.persist(&engine_with_row("x")).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn persist_survives_stale_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.db");
        let store = SnapshotStore::new(&path).unwrap();

        // Simulate a crashed earlier persist leaving garbage behind
        fs::write(path.with_extension("tmp"), b"not a database").unwrap();

        store.persist(&engine_with_row("ok")).unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.query_one("SELECT name FROM items", &[]).unwrap().is_some());
    }

    #[test]
    fn load_missing_snapshot_fails() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent.db")).unwrap();
        assert!(store.load().is_err());
    }
}
