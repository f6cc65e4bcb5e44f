// ABOUTME: Durable-store layer for the in-memory flashstore engine.
// ABOUTME: Provides snapshot persistence, lifecycle management, a single-writer queue, and fault recovery.

pub mod bootstrap;
pub mod error;
pub mod lifecycle;
pub mod snapshot;
pub mod store;

mod retry;
mod writer;

pub use bootstrap::{Bootstrap, ColumnMigration, Seed};
pub use error::StoreError;
pub use flashstore_engine::{Engine, EngineError, Row};
pub use lifecycle::{Lifecycle, LifecycleError};
pub use snapshot::{SnapshotError, SnapshotStore};
pub use store::{Store, StoreConfig};
