// ABOUTME: Store-level error type surfaced to callers of the queued interfaces.
// ABOUTME: Distinguishes terminal statement errors, failed recovery, and queue shutdown.

use flashstore_engine::EngineError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Errors returned by [`crate::Store`] operations.
///
/// Persistence failures never appear here: a failed snapshot write is
/// logged and swallowed, because the in-memory dataset remains correct and
/// the next successful persist restores durability.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A terminal statement error, or a recoverable fault that persisted
    /// through every retry attempt.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// A recoverable fault was detected but reloading the snapshot failed;
    /// carries the original fault as context.
    #[error("recovery failed after engine fault: {fault}")]
    RecoveryFailed {
        fault: EngineError,
        #[source]
        source: LifecycleError,
    },

    /// Store startup failed.
    #[error("store initialization failed: {0}")]
    Init(#[from] LifecycleError),

    /// The writer thread is gone; no further operations can settle.
    #[error("store channel closed")]
    ChannelClosed,

    #[error("failed to spawn writer thread: {0}")]
    Spawn(#[from] std::io::Error),
}
